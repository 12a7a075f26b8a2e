mod tcp;

pub use tcp::{tcp_accept, tcp_connect, tcp_listen, TcpChannel};
