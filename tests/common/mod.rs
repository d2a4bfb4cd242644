// Test harness - in-memory fake server and a pool double
//
// Every acquired connection is one end of a `tokio::io::duplex` pipe; the
// other end is served by a task that parses requests and answers through a
// scripted responder. The pool counts how connections come back.

#![allow(dead_code)]

use bytes::BytesMut;
use redis_geo::{Connection, ConnectionPool, RespParser, RespSerializer, RespValue, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// What the fake server does with one request
pub enum FakeReply {
    Value(RespValue),
    /// Bytes written verbatim, for malformed or partial replies
    Raw(Vec<u8>),
    /// Read the request and never answer
    Hang,
    /// Drop the connection without answering
    Close,
}

type Responder = dyn Fn(&[String]) -> FakeReply + Send + Sync;

pub struct MockPool {
    responder: Arc<Responder>,
    received: Arc<Mutex<Vec<Vec<Vec<u8>>>>>,
    idle: Mutex<Vec<Connection<DuplexStream>>>,
    opened: AtomicUsize,
    released: AtomicUsize,
    discarded: AtomicUsize,
}

impl MockPool {
    pub fn new(responder: impl Fn(&[String]) -> FakeReply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            responder: Arc::new(responder),
            received: Arc::new(Mutex::new(Vec::new())),
            idle: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        })
    }

    /// Answer every request with the same reply
    pub fn replying(reply: RespValue) -> Arc<Self> {
        Self::new(move |_| FakeReply::Value(reply.clone()))
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    /// Requests seen by the server, as lossy strings
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.raw_commands()
            .into_iter()
            .map(|tokens| {
                tokens
                    .into_iter()
                    .map(|t| String::from_utf8_lossy(&t).into_owned())
                    .collect()
            })
            .collect()
    }

    pub fn raw_commands(&self) -> Vec<Vec<Vec<u8>>> {
        self.received.lock().unwrap().clone()
    }

    pub fn last_command(&self) -> Vec<String> {
        self.commands().pop().unwrap_or_default()
    }
}

impl ConnectionPool for MockPool {
    type Stream = DuplexStream;

    async fn acquire(&self) -> Result<Connection<DuplexStream>, TransportError> {
        let reused = self.idle.lock().unwrap().pop();
        if let Some(conn) = reused {
            return Ok(conn);
        }

        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(serve(server, self.responder.clone(), self.received.clone()));
        let id = self.opened.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        Ok(Connection::new(client, id))
    }

    fn release(&self, conn: Connection<DuplexStream>) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.idle.lock().unwrap().push(conn);
    }

    fn discard(&self, conn: Connection<DuplexStream>) {
        self.discarded.fetch_add(1, Ordering::SeqCst);
        drop(conn);
    }
}

async fn serve(mut stream: DuplexStream, responder: Arc<Responder>, received: Arc<Mutex<Vec<Vec<Vec<u8>>>>>) {
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        let request = match RespParser::decode(&mut buf) {
            Ok(Some(RespValue::Array(Some(items)))) => items,
            Ok(Some(_)) | Err(_) => return,
            Ok(None) => match stream.read_buf(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            },
        };

        let tokens: Vec<Vec<u8>> = request
            .iter()
            .map(|item| item.as_bulk_string().unwrap_or_default().to_vec())
            .collect();
        let text: Vec<String> = tokens
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect();
        received.lock().unwrap().push(tokens);

        let written = match responder(&text) {
            FakeReply::Value(value) => stream.write_all(&RespSerializer::serialize(&value)).await,
            FakeReply::Raw(bytes) => stream.write_all(&bytes).await,
            FakeReply::Hang => {
                std::future::pending::<()>().await;
                return;
            }
            FakeReply::Close => return,
        };
        if written.is_err() {
            return;
        }
    }
}

pub fn bulk(s: &str) -> RespValue {
    RespValue::bulk(s)
}

pub fn coord(lon: &str, lat: &str) -> RespValue {
    RespValue::array(vec![bulk(lon), bulk(lat)])
}

/// Canned replies for the Sicily data set (Palermo and Catania)
pub fn sicily(tokens: &[String]) -> FakeReply {
    let args: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let value = match args.as_slice() {
        ["GEOADD", _key, rest @ ..] => {
            let members = rest
                .iter()
                .filter(|t| t.parse::<f64>().is_err() && !matches!(**t, "NX" | "XX" | "CH"));
            RespValue::Integer(members.count() as i64)
        }
        ["GEODIST", "Sicily", "Palermo", "Catania"] => bulk("166274.1516"),
        ["GEODIST", "Sicily", "Palermo", "Catania", "km"] => bulk("166.2742"),
        ["GEODIST", ..] => RespValue::BulkString(None),
        ["GEOHASH", "Sicily", members @ ..] => RespValue::array(
            members
                .iter()
                .map(|m| match *m {
                    "Palermo" => bulk("sqc8b49rny0"),
                    "Catania" => bulk("sqdtr74hyu0"),
                    _ => RespValue::BulkString(None),
                })
                .collect(),
        ),
        ["GEOPOS", "Sicily", members @ ..] => RespValue::array(
            members
                .iter()
                .map(|m| match *m {
                    "Palermo" => coord("13.36138933897018433", "38.11555639549629859"),
                    "Catania" => coord("15.08726745843887329", "37.50266842333162032"),
                    _ => RespValue::Array(None),
                })
                .collect(),
        ),
        ["GEORADIUS", "Sicily", "15", "37", "200", "km", "WITHDIST"] => RespValue::array(vec![
            RespValue::array(vec![bulk("Palermo"), bulk("190.4424")]),
            RespValue::array(vec![bulk("Catania"), bulk("56.4413")]),
        ]),
        ["GEORADIUS", "Sicily", "15", "37", "200", "km", "WITHCOORD"] => RespValue::array(vec![
            RespValue::array(vec![
                bulk("Palermo"),
                coord("13.36138933897018433", "38.11555639549629859"),
            ]),
            RespValue::array(vec![
                bulk("Catania"),
                coord("15.08726745843887329", "37.50266842333162032"),
            ]),
        ]),
        ["GEORADIUS", "Sicily", "15", "37", "200", "km"] => {
            RespValue::array(vec![bulk("Palermo"), bulk("Catania")])
        }
        ["GEORADIUS", "Sicily", "15", "37", "200", "km", "STORE", _] => RespValue::Integer(2),
        ["GEORADIUS", "Nowhere", ..] => RespValue::array(vec![]),
        ["GEORADIUSBYMEMBER", "Sicily", "Palermo", "200", "km"] => RespValue::array(vec![bulk("Palermo")]),
        ["GEOSEARCH", "Sicily", "FROMLONLAT", "15", "37", "BYBOX", "400", "400", "km", "ASC", "WITHDIST"] => {
            RespValue::array(vec![
                RespValue::array(vec![bulk("Catania"), bulk("56.4413")]),
                RespValue::array(vec![bulk("Palermo"), bulk("190.4424")]),
            ])
        }
        ["GEOSEARCHSTORE", ..] => RespValue::Integer(2),
        _ => RespValue::Error(format!("ERR unknown command '{}'", args.first().unwrap_or(&""))),
    };
    FakeReply::Value(value)
}
