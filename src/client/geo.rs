// GEO caller API
//
// Each operation is a request constructor (builder + decoder, no I/O) and an
// async `Client` method running it. The blocking client reuses the same
// constructors through the async methods.

use super::{Client, Request};
use crate::cancel::CancellationToken;
use crate::command::geo::{self as builder, GeoAddOptions, GeoOrigin, GeoPoint, GeoShape, GeoStore, SearchOptions};
use crate::command::ToArg;
use crate::connection::ConnectionPool;
use crate::error::{BuildError, Result};
use crate::reply::{
    ArrayOf, CoordinateReply, FromBulk, GeoRecord, GeoRecordReply, IntegerReply, NullableDouble, Optional,
    OptionalString,
};
use crate::types::{Coordinate, GeoUnit};

pub type GeoHashReply = ArrayOf<OptionalString<String>>;
pub type GeoPosReply = ArrayOf<Optional<CoordinateReply>>;
pub type GeoRadiusReply<M> = Optional<ArrayOf<GeoRecordReply<M>>>;
pub type GeoSearchReply<M> = ArrayOf<GeoRecordReply<M>>;

pub fn geoadd<K: ToArg, M: ToArg>(
    key: K,
    points: &[GeoPoint<M>],
    options: GeoAddOptions,
) -> std::result::Result<Request<IntegerReply>, BuildError> {
    Ok(Request::new(builder::geoadd(key, points, options)?, IntegerReply))
}

pub fn geodist<K: ToArg, M: ToArg>(key: K, member1: M, member2: M, unit: Option<GeoUnit>) -> Request<NullableDouble> {
    Request::new(builder::geodist(key, member1, member2, unit), NullableDouble::default())
}

pub fn geohash<K: ToArg, M: ToArg>(key: K, members: &[M]) -> Request<GeoHashReply> {
    Request::new(builder::geohash(key, members), ArrayOf(OptionalString::default()))
}

pub fn geopos<K: ToArg, M: ToArg>(key: K, members: &[M]) -> Request<GeoPosReply> {
    Request::new(builder::geopos(key, members), ArrayOf(Optional(CoordinateReply)))
}

pub fn georadius<K: ToArg, M: FromBulk>(
    key: K,
    center: Coordinate,
    radius: f64,
    unit: GeoUnit,
    options: &SearchOptions,
) -> std::result::Result<Request<GeoRadiusReply<M>>, BuildError> {
    let command = builder::georadius(key, center, radius, unit, options, None)?;
    Ok(Request::new(command, Optional(ArrayOf(GeoRecordReply::new(options.flags, unit)))))
}

pub fn georadius_by_member<K: ToArg, Q: ToArg, M: FromBulk>(
    key: K,
    member: Q,
    radius: f64,
    unit: GeoUnit,
    options: &SearchOptions,
) -> std::result::Result<Request<GeoRadiusReply<M>>, BuildError> {
    let command = builder::georadius_by_member(key, member, radius, unit, options, None)?;
    Ok(Request::new(command, Optional(ArrayOf(GeoRecordReply::new(options.flags, unit)))))
}

pub fn georadius_store<K: ToArg>(
    key: K,
    center: Coordinate,
    radius: f64,
    unit: GeoUnit,
    options: &SearchOptions,
    store: &GeoStore,
) -> std::result::Result<Request<IntegerReply>, BuildError> {
    let command = builder::georadius(key, center, radius, unit, options, Some(store))?;
    Ok(Request::new(command, IntegerReply))
}

pub fn georadius_by_member_store<K: ToArg, Q: ToArg>(
    key: K,
    member: Q,
    radius: f64,
    unit: GeoUnit,
    options: &SearchOptions,
    store: &GeoStore,
) -> std::result::Result<Request<IntegerReply>, BuildError> {
    let command = builder::georadius_by_member(key, member, radius, unit, options, Some(store))?;
    Ok(Request::new(command, IntegerReply))
}

pub fn geosearch<K: ToArg, Q: ToArg, M: FromBulk>(
    key: K,
    origin: &GeoOrigin<Q>,
    shape: &GeoShape,
    options: &SearchOptions,
) -> std::result::Result<Request<GeoSearchReply<M>>, BuildError> {
    let command = builder::geosearch(key, origin, shape, options)?;
    Ok(Request::new(command, ArrayOf(GeoRecordReply::new(options.flags, shape.unit()))))
}

pub fn geosearchstore<D: ToArg, K: ToArg, Q: ToArg>(
    destination: D,
    source: K,
    origin: &GeoOrigin<Q>,
    shape: &GeoShape,
    options: &SearchOptions,
    store_dist: bool,
) -> std::result::Result<Request<IntegerReply>, BuildError> {
    let command = builder::geosearchstore(destination, source, origin, shape, options, store_dist)?;
    Ok(Request::new(command, IntegerReply))
}

impl<P: ConnectionPool> Client<P> {
    /// Number of members added (or changed, with `CH`)
    pub async fn geoadd<K: ToArg, M: ToArg>(
        &self,
        key: K,
        points: &[GeoPoint<M>],
        options: GeoAddOptions,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.query(geoadd(key, points, options)?, cancel).await
    }

    /// `None` when either member is missing
    pub async fn geodist<K: ToArg, M: ToArg>(
        &self,
        key: K,
        member1: M,
        member2: M,
        unit: Option<GeoUnit>,
        cancel: &CancellationToken,
    ) -> Result<Option<f64>> {
        self.query(geodist(key, member1, member2, unit), cancel).await
    }

    pub async fn geohash<K: ToArg, M: ToArg>(
        &self,
        key: K,
        members: &[M],
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<String>>> {
        self.query(geohash(key, members), cancel).await
    }

    pub async fn geopos<K: ToArg, M: ToArg>(
        &self,
        key: K,
        members: &[M],
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Coordinate>>> {
        self.query(geopos(key, members), cancel).await
    }

    pub async fn georadius<K: ToArg, M: FromBulk>(
        &self,
        key: K,
        center: Coordinate,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<GeoRecord<M>>>> {
        self.query(georadius(key, center, radius, unit, options)?, cancel).await
    }

    pub async fn georadius_by_member<K: ToArg, Q: ToArg, M: FromBulk>(
        &self,
        key: K,
        member: Q,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<GeoRecord<M>>>> {
        self.query(georadius_by_member(key, member, radius, unit, options)?, cancel)
            .await
    }

    /// Number of members written to the store target
    pub async fn georadius_store<K: ToArg>(
        &self,
        key: K,
        center: Coordinate,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        store: &GeoStore,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.query(georadius_store(key, center, radius, unit, options, store)?, cancel)
            .await
    }

    pub async fn georadius_by_member_store<K: ToArg, Q: ToArg>(
        &self,
        key: K,
        member: Q,
        radius: f64,
        unit: GeoUnit,
        options: &SearchOptions,
        store: &GeoStore,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.query(
            georadius_by_member_store(key, member, radius, unit, options, store)?,
            cancel,
        )
        .await
    }

    pub async fn geosearch<K: ToArg, Q: ToArg, M: FromBulk>(
        &self,
        key: K,
        origin: &GeoOrigin<Q>,
        shape: &GeoShape,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeoRecord<M>>> {
        self.query(geosearch(key, origin, shape, options)?, cancel).await
    }

    pub async fn geosearchstore<D: ToArg, K: ToArg, Q: ToArg>(
        &self,
        destination: D,
        source: K,
        origin: &GeoOrigin<Q>,
        shape: &GeoShape,
        options: &SearchOptions,
        store_dist: bool,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        self.query(
            geosearchstore(destination, source, origin, shape, options, store_dist)?,
            cancel,
        )
        .await
    }
}
