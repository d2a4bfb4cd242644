// GEO reply decoders
//
// Search replies are positional: with no WITH* flags each element is a bare
// member, otherwise an array of member, [distance], [hash], [[lon, lat]] in
// that order. The decoder must be given the same flags the command was built
// with.

use super::{BulkReply, Decode, DoubleReply, FromBulk, ResultShape};
use crate::error::DecodeError;
use crate::protocol::RespValue;
use crate::types::{Coordinate, Distance, GeoFlags, GeoUnit};
use serde::Serialize;
use std::marker::PhantomData;

/// Geohash scores are 52-bit integers
const GEOHASH_LIMIT: i64 = 1 << 52;

/// `[longitude, latitude]`
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateReply;

impl Decode for CoordinateReply {
    type Output = Coordinate;

    fn shape(&self) -> ResultShape {
        ResultShape::Coordinate
    }

    fn decode(&self, reply: RespValue) -> Result<Coordinate, DecodeError> {
        let items = match reply {
            RespValue::Array(Some(items)) => items,
            other => return Err(self.mismatch(&other)),
        };
        let [longitude, latitude]: [RespValue; 2] = items.try_into().map_err(|items: Vec<RespValue>| {
            DecodeError::new(self.shape(), format!("array of {} elements", items.len()))
        })?;
        Ok(Coordinate {
            longitude: DoubleReply.decode(longitude).map_err(|e| self.nested(e))?,
            latitude: DoubleReply.decode(latitude).map_err(|e| self.nested(e))?,
        })
    }
}

impl CoordinateReply {
    fn nested(&self, err: DecodeError) -> DecodeError {
        DecodeError::new(self.shape(), format!("element that is not a {}: {}", err.expected, err.found))
    }
}

/// One element of a GEORADIUS / GEOSEARCH reply.
///
/// Each optional field is `Some` exactly when the matching flag was requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRecord<M> {
    pub member: M,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Coordinate>,
}

impl<M> GeoRecord<M> {
    pub fn member(member: M) -> Self {
        Self {
            member,
            distance: None,
            hash: None,
            coordinate: None,
        }
    }
}

/// Decodes one search element according to `flags`. `unit` tags distances.
#[derive(Debug, Clone, Copy)]
pub struct GeoRecordReply<M> {
    flags: GeoFlags,
    unit: GeoUnit,
    _member: PhantomData<fn() -> M>,
}

impl<M> GeoRecordReply<M> {
    pub fn new(flags: GeoFlags, unit: GeoUnit) -> Self {
        Self {
            flags,
            unit,
            _member: PhantomData,
        }
    }

    pub fn flags(&self) -> GeoFlags {
        self.flags
    }

    fn field_count(&self) -> usize {
        1 + self.flags.bits().count_ones() as usize
    }
}

impl<M: FromBulk> Decode for GeoRecordReply<M> {
    type Output = GeoRecord<M>;

    fn shape(&self) -> ResultShape {
        ResultShape::GeoRecord(self.flags)
    }

    fn decode(&self, reply: RespValue) -> Result<GeoRecord<M>, DecodeError> {
        if self.flags.is_empty() {
            return match reply {
                RespValue::BulkString(Some(_)) | RespValue::SimpleString(_) => {
                    Ok(GeoRecord::member(self.member(reply)?))
                }
                other => Err(self.mismatch(&other)),
            };
        }

        let items = match reply {
            RespValue::Array(Some(items)) => items,
            other => return Err(self.mismatch(&other)),
        };
        if items.len() != self.field_count() {
            return Err(DecodeError::new(
                self.shape(),
                format!("array of {} elements", items.len()),
            ));
        }

        let mut fields = items.into_iter();
        let mut next = || fields.next().unwrap_or(RespValue::Null);

        let mut record = GeoRecord::member(self.member(next())?);
        if self.flags.contains(GeoFlags::WITH_DIST) {
            let value = DoubleReply.decode(next()).map_err(|e| self.field("distance", e.found))?;
            record.distance = Some(Distance {
                value,
                unit: self.unit,
            });
        }
        if self.flags.contains(GeoFlags::WITH_HASH) {
            record.hash = Some(self.hash(next())?);
        }
        if self.flags.contains(GeoFlags::WITH_COORD) {
            let coordinate = CoordinateReply
                .decode(next())
                .map_err(|e| self.field("coordinate", e.found))?;
            record.coordinate = Some(coordinate);
        }
        Ok(record)
    }
}

impl<M: FromBulk> GeoRecordReply<M> {
    fn member(&self, reply: RespValue) -> Result<M, DecodeError> {
        BulkReply::<M>::new()
            .decode(reply)
            .map_err(|e| self.field("member", e.found))
    }

    fn hash(&self, reply: RespValue) -> Result<u64, DecodeError> {
        match reply {
            RespValue::Integer(h) if (0..GEOHASH_LIMIT).contains(&h) => Ok(h as u64),
            RespValue::Integer(h) => Err(self.field("hash", format!("{} outside 52 bits", h))),
            other => Err(self.field("hash", other.kind())),
        }
    }

    fn field(&self, name: &str, found: impl std::fmt::Display) -> DecodeError {
        DecodeError::new(self.shape(), format!("{} field: {}", name, found))
    }
}
