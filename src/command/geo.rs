// GEO command builders
//
// Pure functions from typed parameters to protocol tokens. Mandatory
// positional arguments come first, then optional tokens in the order the
// server grammar expects them.

use super::{Command, ToArg};
use crate::error::BuildError;
use crate::types::{Coordinate, GeoCount, GeoFlags, GeoOrder, GeoUnit};
use bytes::Bytes;

/// A member to add at a position
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint<M> {
    pub coordinate: Coordinate,
    pub member: M,
}

impl<M> GeoPoint<M> {
    pub fn new(longitude: f64, latitude: f64, member: M) -> Self {
        Self {
            coordinate: Coordinate::new(longitude, latitude),
            member,
        }
    }
}

/// `NX` / `XX` for GEOADD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoAddCondition {
    #[default]
    Always,
    /// NX: only add new members
    OnlyNew,
    /// XX: only update existing members
    OnlyExisting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoAddOptions {
    pub condition: GeoAddCondition,
    /// CH: count changed members, not only added ones
    pub changed: bool,
}

impl GeoAddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: GeoAddCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }
}

/// Center of a GEOSEARCH
#[derive(Debug, Clone, PartialEq)]
pub enum GeoOrigin<M> {
    Member(M),
    LonLat(Coordinate),
}

/// Area of a GEOSEARCH
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoShape {
    Radius { radius: f64, unit: GeoUnit },
    Box { width: f64, height: f64, unit: GeoUnit },
}

impl GeoShape {
    pub fn radius(radius: f64, unit: GeoUnit) -> Self {
        GeoShape::Radius { radius, unit }
    }

    pub fn rect(width: f64, height: f64, unit: GeoUnit) -> Self {
        GeoShape::Box {
            width,
            height,
            unit,
        }
    }

    /// Unit distances in the reply are expressed in
    pub fn unit(&self) -> GeoUnit {
        match self {
            GeoShape::Radius { unit, .. } | GeoShape::Box { unit, .. } => *unit,
        }
    }
}

/// Optional tokens shared by GEORADIUS, GEORADIUSBYMEMBER and GEOSEARCH
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub flags: GeoFlags,
    pub count: Option<GeoCount>,
    pub order: Option<GeoOrder>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: GeoFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_coord(mut self) -> Self {
        self.flags |= GeoFlags::WITH_COORD;
        self
    }

    pub fn with_dist(mut self) -> Self {
        self.flags |= GeoFlags::WITH_DIST;
        self
    }

    pub fn with_hash(mut self) -> Self {
        self.flags |= GeoFlags::WITH_HASH;
        self
    }

    pub fn with_count(mut self, count: GeoCount) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_order(mut self, order: GeoOrder) -> Self {
        self.order = Some(order);
        self
    }
}

/// Destination of a GEORADIUS STORE / STOREDIST
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoStore {
    /// STORE: members with their geohash scores
    Members(Bytes),
    /// STOREDIST: members scored by distance from the center
    Distances(Bytes),
}

impl GeoStore {
    pub fn members(key: impl ToArg) -> Self {
        GeoStore::Members(key.to_arg())
    }

    pub fn distances(key: impl ToArg) -> Self {
        GeoStore::Distances(key.to_arg())
    }
}

/// GEOADD key [NX|XX] [CH] longitude latitude member [...]
pub fn geoadd<K: ToArg, M: ToArg>(
    key: K,
    points: &[GeoPoint<M>],
    options: GeoAddOptions,
) -> Result<Command, BuildError> {
    if points.is_empty() {
        return Err(BuildError::invalid("points", "at least one point is required"));
    }

    let mut cmd = Command::new("GEOADD");
    cmd.arg(key);
    match options.condition {
        GeoAddCondition::Always => {}
        GeoAddCondition::OnlyNew => {
            cmd.keyword("NX");
        }
        GeoAddCondition::OnlyExisting => {
            cmd.keyword("XX");
        }
    }
    if options.changed {
        cmd.keyword("CH");
    }
    for point in points {
        cmd.float("longitude", point.coordinate.longitude)?
            .float("latitude", point.coordinate.latitude)?
            .arg(&point.member);
    }
    Ok(cmd)
}

/// GEODIST key member1 member2 [unit]
pub fn geodist<K: ToArg, M: ToArg>(key: K, member1: M, member2: M, unit: Option<GeoUnit>) -> Command {
    let mut cmd = Command::new("GEODIST");
    cmd.arg(key).arg(member1).arg(member2);
    if let Some(unit) = unit {
        cmd.keyword(unit.as_str());
    }
    cmd
}

/// GEOHASH key member [...]
pub fn geohash<K: ToArg, M: ToArg>(key: K, members: &[M]) -> Command {
    let mut cmd = Command::new("GEOHASH");
    cmd.arg(key);
    for member in members {
        cmd.arg(member);
    }
    cmd
}

/// GEOPOS key member [...]
pub fn geopos<K: ToArg, M: ToArg>(key: K, members: &[M]) -> Command {
    let mut cmd = Command::new("GEOPOS");
    cmd.arg(key);
    for member in members {
        cmd.arg(member);
    }
    cmd
}

/// GEORADIUS key longitude latitude radius unit [WITHCOORD] [WITHDIST]
/// [WITHHASH] [COUNT n [ANY]] [ASC|DESC] [STORE key] [STOREDIST key]
pub fn georadius<K: ToArg>(
    key: K,
    center: Coordinate,
    radius: f64,
    unit: GeoUnit,
    options: &SearchOptions,
    store: Option<&GeoStore>,
) -> Result<Command, BuildError> {
    let mut cmd = Command::new("GEORADIUS");
    cmd.arg(key)
        .float("longitude", center.longitude)?
        .float("latitude", center.latitude)?;
    push_radius_tail(&mut cmd, radius, unit, options, store)?;
    Ok(cmd)
}

/// GEORADIUSBYMEMBER key member radius unit [...], same tail as GEORADIUS
pub fn georadius_by_member<K: ToArg, M: ToArg>(
    key: K,
    member: M,
    radius: f64,
    unit: GeoUnit,
    options: &SearchOptions,
    store: Option<&GeoStore>,
) -> Result<Command, BuildError> {
    let mut cmd = Command::new("GEORADIUSBYMEMBER");
    cmd.arg(key).arg(member);
    push_radius_tail(&mut cmd, radius, unit, options, store)?;
    Ok(cmd)
}

/// GEOSEARCH key FROMMEMBER m|FROMLONLAT lon lat BYRADIUS r unit|BYBOX w h unit
/// [ASC|DESC] [COUNT n [ANY]] [WITHCOORD] [WITHDIST] [WITHHASH]
pub fn geosearch<K: ToArg, M: ToArg>(
    key: K,
    origin: &GeoOrigin<M>,
    shape: &GeoShape,
    options: &SearchOptions,
) -> Result<Command, BuildError> {
    let mut cmd = Command::new("GEOSEARCH");
    cmd.arg(key);
    push_origin_and_shape(&mut cmd, origin, shape)?;
    push_order_and_count(&mut cmd, options)?;
    push_flags(&mut cmd, options.flags);
    Ok(cmd)
}

/// GEOSEARCHSTORE destination source FROM... BY... [ASC|DESC] [COUNT n [ANY]] [STOREDIST]
pub fn geosearchstore<D: ToArg, K: ToArg, M: ToArg>(
    destination: D,
    source: K,
    origin: &GeoOrigin<M>,
    shape: &GeoShape,
    options: &SearchOptions,
    store_dist: bool,
) -> Result<Command, BuildError> {
    if !options.flags.is_empty() {
        return Err(BuildError::Conflict {
            first: "geosearchstore",
            second: "WITHCOORD/WITHDIST/WITHHASH",
        });
    }

    let mut cmd = Command::new("GEOSEARCHSTORE");
    cmd.arg(destination).arg(source);
    push_origin_and_shape(&mut cmd, origin, shape)?;
    push_order_and_count(&mut cmd, options)?;
    if store_dist {
        cmd.keyword("STOREDIST");
    }
    Ok(cmd)
}

fn push_radius_tail(
    cmd: &mut Command,
    radius: f64,
    unit: GeoUnit,
    options: &SearchOptions,
    store: Option<&GeoStore>,
) -> Result<(), BuildError> {
    if store.is_some() && !options.flags.is_empty() {
        return Err(BuildError::Conflict {
            first: "store",
            second: "WITHCOORD/WITHDIST/WITHHASH",
        });
    }

    cmd.float("radius", non_negative("radius", radius)?)?
        .keyword(unit.as_str());
    push_flags(cmd, options.flags);
    if let Some(count) = &options.count {
        push_count(cmd, count)?;
    }
    if let Some(order) = options.order {
        cmd.keyword(order.as_str());
    }
    match store {
        Some(GeoStore::Members(key)) => {
            cmd.keyword("STORE").arg(key);
        }
        Some(GeoStore::Distances(key)) => {
            cmd.keyword("STOREDIST").arg(key);
        }
        None => {}
    }
    Ok(())
}

fn push_origin_and_shape<M: ToArg>(
    cmd: &mut Command,
    origin: &GeoOrigin<M>,
    shape: &GeoShape,
) -> Result<(), BuildError> {
    match origin {
        GeoOrigin::Member(member) => {
            cmd.keyword("FROMMEMBER").arg(member);
        }
        GeoOrigin::LonLat(center) => {
            cmd.keyword("FROMLONLAT")
                .float("longitude", center.longitude)?
                .float("latitude", center.latitude)?;
        }
    }
    match *shape {
        GeoShape::Radius { radius, unit } => {
            cmd.keyword("BYRADIUS")
                .float("radius", non_negative("radius", radius)?)?
                .keyword(unit.as_str());
        }
        GeoShape::Box {
            width,
            height,
            unit,
        } => {
            cmd.keyword("BYBOX")
                .float("width", non_negative("width", width)?)?
                .float("height", non_negative("height", height)?)?
                .keyword(unit.as_str());
        }
    }
    Ok(())
}

fn push_order_and_count(cmd: &mut Command, options: &SearchOptions) -> Result<(), BuildError> {
    if let Some(order) = options.order {
        cmd.keyword(order.as_str());
    }
    if let Some(count) = &options.count {
        push_count(cmd, count)?;
    }
    Ok(())
}

fn push_flags(cmd: &mut Command, flags: GeoFlags) {
    if flags.contains(GeoFlags::WITH_COORD) {
        cmd.keyword("WITHCOORD");
    }
    if flags.contains(GeoFlags::WITH_DIST) {
        cmd.keyword("WITHDIST");
    }
    if flags.contains(GeoFlags::WITH_HASH) {
        cmd.keyword("WITHHASH");
    }
}

fn push_count(cmd: &mut Command, count: &GeoCount) -> Result<(), BuildError> {
    if count.count == 0 {
        return Err(BuildError::invalid("count", "must be greater than zero"));
    }
    cmd.keyword("COUNT").uint(count.count);
    if count.any {
        cmd.keyword("ANY");
    }
    Ok(())
}

fn non_negative(param: &'static str, value: f64) -> Result<f64, BuildError> {
    if value < 0.0 {
        return Err(BuildError::invalid(param, format!("{} is negative", value)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(cmd: &Command) -> Vec<String> {
        cmd.to_strings()
    }

    #[test]
    fn test_geoadd_palermo() {
        let cmd = geoadd(
            "cities",
            &[GeoPoint::new(13.361389, 38.115556, "Palermo")],
            GeoAddOptions::default(),
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec!["GEOADD", "cities", "13.361389", "38.115556", "Palermo"]
        );
    }

    #[test]
    fn test_geoadd_options_precede_points() {
        let cmd = geoadd(
            "cities",
            &[
                GeoPoint::new(13.361389, 38.115556, "Palermo"),
                GeoPoint::new(15.087269, 37.502669, "Catania"),
            ],
            GeoAddOptions::new()
                .with_condition(GeoAddCondition::OnlyExisting)
                .with_changed(true),
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec![
                "GEOADD", "cities", "XX", "CH", "13.361389", "38.115556", "Palermo", "15.087269",
                "37.502669", "Catania"
            ]
        );

        let nx = geoadd(
            "k",
            &[GeoPoint::new(1.0, 2.0, "m")],
            GeoAddOptions::new().with_condition(GeoAddCondition::OnlyNew),
        )
        .unwrap();
        assert_eq!(tokens(&nx), vec!["GEOADD", "k", "NX", "1", "2", "m"]);
    }

    #[test]
    fn test_geoadd_validation() {
        let err = geoadd("k", &[] as &[GeoPoint<&str>], GeoAddOptions::default()).unwrap_err();
        assert_eq!(err.param(), "points");

        let err = geoadd(
            "k",
            &[GeoPoint::new(f64::NAN, 1.0, "m")],
            GeoAddOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.param(), "longitude");

        let err = geoadd(
            "k",
            &[GeoPoint::new(1.0, f64::INFINITY, "m")],
            GeoAddOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.param(), "latitude");
    }

    #[test]
    fn test_geoadd_binary_member() {
        let text = geoadd("k", &[GeoPoint::new(1.5, 2.5, "abc")], GeoAddOptions::default()).unwrap();
        let binary = geoadd(
            b"k".to_vec(),
            &[GeoPoint::new(1.5, 2.5, b"abc".to_vec())],
            GeoAddOptions::default(),
        )
        .unwrap();
        assert_eq!(text, binary);
    }

    #[test]
    fn test_geodist() {
        let cmd = geodist("cities", "Palermo", "Catania", Some(GeoUnit::Kilometers));
        assert_eq!(tokens(&cmd), vec!["GEODIST", "cities", "Palermo", "Catania", "km"]);

        let cmd = geodist("cities", "Palermo", "Catania", None);
        assert_eq!(tokens(&cmd), vec!["GEODIST", "cities", "Palermo", "Catania"]);
    }

    #[test]
    fn test_geohash_and_geopos() {
        let members = ["Palermo", "Catania", "NonExisting"];
        assert_eq!(
            tokens(&geohash("cities", &members)),
            vec!["GEOHASH", "cities", "Palermo", "Catania", "NonExisting"]
        );
        assert_eq!(
            tokens(&geopos("cities", &members[..1])),
            vec!["GEOPOS", "cities", "Palermo"]
        );
    }

    #[test]
    fn test_georadius_full_grammar() {
        let options = SearchOptions::new()
            .with_hash()
            .with_coord()
            .with_dist()
            .with_count(GeoCount::any(3))
            .with_order(GeoOrder::Desc);
        let cmd = georadius(
            "cities",
            Coordinate::new(15.0, 37.0),
            200.0,
            GeoUnit::Kilometers,
            &options,
            None,
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec![
                "GEORADIUS", "cities", "15", "37", "200", "km", "WITHCOORD", "WITHDIST",
                "WITHHASH", "COUNT", "3", "ANY", "DESC"
            ]
        );
    }

    #[test]
    fn test_georadius_store() {
        let options = SearchOptions::new()
            .with_count(GeoCount::new(10))
            .with_order(GeoOrder::Asc);
        let cmd = georadius(
            "cities",
            Coordinate::new(15.0, 37.0),
            100.5,
            GeoUnit::Meters,
            &options,
            Some(&GeoStore::distances("nearby")),
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec![
                "GEORADIUS", "cities", "15", "37", "100.5", "m", "COUNT", "10", "ASC", "STOREDIST",
                "nearby"
            ]
        );

        let err = georadius(
            "cities",
            Coordinate::new(15.0, 37.0),
            100.0,
            GeoUnit::Meters,
            &SearchOptions::new().with_dist(),
            Some(&GeoStore::members("nearby")),
        )
        .unwrap_err();
        assert_eq!(err.param(), "store");
    }

    #[test]
    fn test_georadius_by_member() {
        let cmd = georadius_by_member(
            "Sicily",
            "Agrigento",
            100.0,
            GeoUnit::Kilometers,
            &SearchOptions::default(),
            Some(&GeoStore::members("out")),
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec!["GEORADIUSBYMEMBER", "Sicily", "Agrigento", "100", "km", "STORE", "out"]
        );
    }

    #[test]
    fn test_radius_validation() {
        let err = georadius(
            "k",
            Coordinate::new(0.0, 0.0),
            -1.0,
            GeoUnit::Meters,
            &SearchOptions::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.param(), "radius");

        let err = georadius_by_member(
            "k",
            "m",
            1.0,
            GeoUnit::Meters,
            &SearchOptions::new().with_count(GeoCount::new(0)),
            None,
        )
        .unwrap_err();
        assert_eq!(err.param(), "count");
    }

    #[test]
    fn test_geosearch_from_lonlat_by_box() {
        let cmd = geosearch(
            "Sicily",
            &GeoOrigin::<&str>::LonLat(Coordinate::new(15.0, 37.0)),
            &GeoShape::rect(400.0, 400.0, GeoUnit::Kilometers),
            &SearchOptions::new()
                .with_order(GeoOrder::Asc)
                .with_count(GeoCount::any(2))
                .with_coord()
                .with_dist(),
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec![
                "GEOSEARCH", "Sicily", "FROMLONLAT", "15", "37", "BYBOX", "400", "400", "km",
                "ASC", "COUNT", "2", "ANY", "WITHCOORD", "WITHDIST"
            ]
        );
    }

    #[test]
    fn test_geosearch_from_member_by_radius() {
        let cmd = geosearch(
            "Sicily",
            &GeoOrigin::Member("Palermo"),
            &GeoShape::radius(50.0, GeoUnit::Miles),
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec!["GEOSEARCH", "Sicily", "FROMMEMBER", "Palermo", "BYRADIUS", "50", "mi"]
        );

        let err = geosearch(
            "Sicily",
            &GeoOrigin::Member("Palermo"),
            &GeoShape::rect(10.0, -2.0, GeoUnit::Feet),
            &SearchOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.param(), "height");
    }

    #[test]
    fn test_geosearchstore() {
        let cmd = geosearchstore(
            "dest",
            "Sicily",
            &GeoOrigin::<&str>::LonLat(Coordinate::new(15.0, 37.0)),
            &GeoShape::radius(200.0, GeoUnit::Kilometers),
            &SearchOptions::new().with_count(GeoCount::new(3)).with_order(GeoOrder::Desc),
            true,
        )
        .unwrap();
        assert_eq!(
            tokens(&cmd),
            vec![
                "GEOSEARCHSTORE", "dest", "Sicily", "FROMLONLAT", "15", "37", "BYRADIUS", "200",
                "km", "DESC", "COUNT", "3", "STOREDIST"
            ]
        );

        let err = geosearchstore(
            "dest",
            "Sicily",
            &GeoOrigin::Member("Palermo"),
            &GeoShape::radius(1.0, GeoUnit::Meters),
            &SearchOptions::new().with_hash(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Conflict { .. }));
    }

    #[test]
    fn test_flag_tokens_for_every_combination() {
        for bits in 0..8u8 {
            let flags = GeoFlags::from_bits_truncate(bits);
            let cmd = geosearch(
                "k",
                &GeoOrigin::Member("m"),
                &GeoShape::radius(1.0, GeoUnit::Meters),
                &SearchOptions::new().with_flags(flags),
            )
            .unwrap();
            let tail: Vec<String> = tokens(&cmd).into_iter().skip(7).collect();

            let mut expected = Vec::new();
            if flags.contains(GeoFlags::WITH_COORD) {
                expected.push("WITHCOORD");
            }
            if flags.contains(GeoFlags::WITH_DIST) {
                expected.push("WITHDIST");
            }
            if flags.contains(GeoFlags::WITH_HASH) {
                expected.push("WITHHASH");
            }
            assert_eq!(tail, expected, "flags {:?}", flags);
        }
    }
}
