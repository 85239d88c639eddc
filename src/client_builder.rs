use tokio::io::{BufReader, duplex, split};

use crate::{Client, Methods};

impl Client {
    /// Creates a connected pair of in-memory clients. Frames written by one
    /// side are delivered to the other.
    pub fn channel(methods0: Methods, methods1: Methods) -> (Client, Client) {
        let (d0, d1) = duplex(1024);
        let (r0, w0) = split(d0);
        let (r1, w1) = split(d1);
        let c0 = Client::with_methods(methods0, BufReader::new(r0), w0);
        let c1 = Client::with_methods(methods1, BufReader::new(r1), w1);
        (c0, c1)
    }

    /// Connects a client over this process's stdin and stdout.
    pub fn from_stdio(methods: Methods) -> Client {
        Client::with_methods(
            methods,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }
}
