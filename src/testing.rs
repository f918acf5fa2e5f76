use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::connection::Connection;
use crate::endpoint::Endpoint;

pub async fn pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (client, server)
}

// Client connected with a receive buffer of about `size` bytes.
pub async fn small_client(addr: SocketAddr, size: u32) -> TcpStream {
    let socket = TcpSocket::new_v4().unwrap();
    socket.set_recv_buffer_size(size).unwrap();
    socket.connect(addr).await.unwrap()
}

// Like `pair`, but the client's send buffer and the server's receive buffer
// are shrunk to about `size` bytes, so writes into the client back up fast
// when the server does not read.
pub async fn small_pair(size: u32) -> (TcpStream, TcpStream) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.set_recv_buffer_size(size).unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(16).unwrap();
    let addr = listener.local_addr().unwrap();

    let socket = TcpSocket::new_v4().unwrap();
    socket.set_send_buffer_size(size).unwrap();
    let client = socket.connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (client, server)
}

pub async fn connection() -> (TcpStream, Connection, TcpStream) {
    let destination = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let redirect = Endpoint::new("127.0.0.1", destination.local_addr().unwrap().port());

    let (client, inbound) = pair().await;
    let peer = client.local_addr().unwrap();
    let conn = Connection::connect(inbound, peer, &redirect).await.unwrap();
    let (server, _) = destination.accept().await.unwrap();

    (client, conn, server)
}

pub fn drain(stream: &TcpStream) -> Vec<u8> {
    let mut rv = vec![];
    let mut buf = [0; 8192];
    loop {
        match stream.try_read(&mut buf) {
            Ok(0) => break,
            Ok(n) => rv.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => panic!("Failed to read from socket: {:?}", e),
        }
    }
    rv
}

pub async fn pump_until(conn: &mut Connection, stream: &TcpStream, len: usize) -> Vec<u8> {
    let mut received = vec![];
    for _ in 0..5_000 {
        assert!(conn.update().await, "connection closed while relaying");
        received.extend(drain(stream));
        if received.len() >= len {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    received
}

pub async fn update_until_closed(conn: &mut Connection) -> bool {
    for _ in 0..500 {
        if !conn.update().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    false
}

pub async fn echo(mut socket: TcpStream, upper: bool) {
    let mut buf = [0; 1024];
    while let Ok(n) = socket.read(&mut buf).await {
        if n == 0 {
            break;
        }
        if upper {
            buf[..n].make_ascii_uppercase();
        }
        if socket.write_all(&buf[..n]).await.is_err() {
            break;
        }
    }
}

pub async fn echo_server(upper: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(echo(socket, upper));
        }
    });
    addr
}
