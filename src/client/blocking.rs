// Blocking client
//
// Owns a current-thread runtime and drives the async client on it, so both
// call styles share one dispatch and decode path. Must not be used from
// inside another tokio runtime.

use super::{Client, Request};
use crate::cancel::CancellationToken;
use crate::command::geo::{GeoAddOptions, GeoOrigin, GeoPoint, GeoShape, GeoStore, SearchOptions};
use crate::command::{Command, ToArg};
use crate::config::ClientConfig;
use crate::connection::{ConnectionPool, TcpPool};
use crate::error::{Result, TransportError};
use crate::protocol::RespValue;
use crate::reply::{Decode, FromBulk, GeoRecord};
use crate::types::{Coordinate, GeoUnit};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

pub struct BlockingClient<P> {
    inner: Client<P>,
    runtime: Runtime,
}

impl BlockingClient<TcpPool> {
    pub fn connect(config: ClientConfig) -> Result<Self> {
        Self::new(Client::connect(config))
    }
}

impl<P: ConnectionPool> BlockingClient<P> {
    pub fn new(inner: Client<P>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::from)?;
        Ok(Self { inner, runtime })
    }

    pub fn with_pool(pool: Arc<P>, command_timeout: Option<Duration>) -> Result<Self> {
        Self::new(Client::with_pool(pool, command_timeout))
    }

    pub fn client(&self) -> &Client<P> {
        &self.inner
    }

    pub fn query<D: Decode>(&self, request: Request<D>, cancel: &CancellationToken) -> Result<D::Output> {
        self.runtime.block_on(self.inner.query(request, cancel))
    }

    pub fn execute(&self, command: Command, cancel: &CancellationToken) -> Result<RespValue> {
        self.runtime.block_on(self.inner.execute(command, cancel))
    }

    pub fn geoadd<K: ToArg, M: ToArg>(
        &self,
        key: K,
        points: &[GeoPoint<M>],
        options: GeoAddOptions,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.runtime.block_on(self.inner.geoadd(key, points, options, cancel))
    }

    pub fn geodist<K: ToArg, M: ToArg>(
        &self,
        key: K,
        member1: M,
        member2: M,
        unit: Option<GeoUnit>,
        cancel: &CancellationToken,
    ) -> Result<Option<f64>> {
        self.runtime
            .block_on(self.inner.geodist(key, member1, member2, unit, cancel))
    }

    pub fn geohash<K: ToArg, M: ToArg>(
        &self,
        key: K,
        members: &[M],
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<String>>> {
        self.runtime.block_on(self.inner.geohash(key, members, cancel))
    }

    pub fn geopos<K: ToArg, M: ToArg>(
        &self,
        key: K,
        members: &[M],
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Coordinate>>> {
        self.runtime.block_on(self.inner.geopos(key, members, cancel))
    }

    pub fn georadius<K: ToArg, M: FromBulk>(
        &self,
        key: K,
        center: Coordinate,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<GeoRecord<M>>>> {
        self.runtime
            .block_on(self.inner.georadius(key, center, radius, unit, options, cancel))
    }

    pub fn georadius_by_member<K: ToArg, Q: ToArg, M: FromBulk>(
        &self,
        key: K,
        member: Q,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<GeoRecord<M>>>> {
        self.runtime.block_on(
            self.inner
                .georadius_by_member(key, member, radius, unit, options, cancel),
        )
    }

    pub fn georadius_store<K: ToArg>(
        &self,
        key: K,
        center: Coordinate,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        store: &GeoStore,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.runtime.block_on(
            self.inner
                .georadius_store(key, center, radius, unit, options, store, cancel),
        )
    }

    pub fn georadius_by_member_store<K: ToArg, Q: ToArg>(
        &self,
        key: K,
        member: Q,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        store: &GeoStore,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.runtime.block_on(
            self.inner
                .georadius_by_member_store(key, member, radius, unit, options, store, cancel),
        )
    }

    pub fn geosearch<K: ToArg, Q: ToArg, M: FromBulk>(
        &self,
        key: K,
        origin: &GeoOrigin<Q>,
        shape: &GeoShape,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeoRecord<M>>> {
        self.runtime
            .block_on(self.inner.geosearch(key, origin, shape, options, cancel))
    }

    pub fn geosearchstore<D: ToArg, K: ToArg, Q: ToArg>(
        &self,
        destination: D,
        source: K,
        origin: &GeoOrigin<Q>,
        shape: &GeoShape,
        options: &SearchOptions,
        store_dist: bool,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.runtime.block_on(self.inner.geosearchstore(
            destination,
            source,
            origin,
            shape,
            options,
            store_dist,
            cancel,
        ))
    }
}
