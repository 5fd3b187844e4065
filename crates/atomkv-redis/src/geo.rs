//! `GEORADIUS` command construction and reply parsing.
//!
//! Without any `WITH*` flag the server replies with a flat list of member
//! names. With flags, every entry is an array of the name followed by the
//! requested fields in a fixed order: distance, geohash, then the
//! `[longitude, latitude]` pair.

use atomkv_cache::{GeoLocation, GeoRadiusQuery, GeoSort};
use redis::{Cmd, ErrorKind, RedisError, RedisResult, Value, cmd, from_redis_value};

pub(crate) fn georadius(key: &str, longitude: f64, latitude: f64, query: &GeoRadiusQuery) -> Cmd {
    let mut c = cmd("GEORADIUS");
    c.arg(key)
        .arg(longitude)
        .arg(latitude)
        .arg(query.radius)
        .arg(query.unit.as_str());
    if query.with_coord {
        c.arg("WITHCOORD");
    }
    if query.with_dist {
        c.arg("WITHDIST");
    }
    if query.with_hash {
        c.arg("WITHHASH");
    }
    if query.count > 0 {
        c.arg("COUNT").arg(query.count);
    }
    match query.sort {
        GeoSort::Asc => {
            c.arg("ASC");
        }
        GeoSort::Desc => {
            c.arg("DESC");
        }
        GeoSort::Unsorted => {}
    }
    c
}

fn malformed(detail: String) -> RedisError {
    RedisError::from((ErrorKind::TypeError, "malformed GEORADIUS reply", detail))
}

pub(crate) fn parse_radius_reply(
    reply: &Value,
    query: &GeoRadiusQuery,
) -> RedisResult<Vec<GeoLocation>> {
    let Value::Array(entries) = reply else {
        return Err(malformed(format!("expected an array, got {reply:?}")));
    };
    let plain = !(query.with_coord || query.with_dist || query.with_hash);
    entries
        .iter()
        .map(|entry| {
            if plain {
                Ok(GeoLocation {
                    name: from_redis_value(entry)?,
                    ..GeoLocation::default()
                })
            } else {
                parse_entry(entry, query)
            }
        })
        .collect()
}

fn parse_entry(entry: &Value, query: &GeoRadiusQuery) -> RedisResult<GeoLocation> {
    let Value::Array(fields) = entry else {
        return Err(malformed(format!("expected an entry array, got {entry:?}")));
    };
    let mut fields = fields.iter();
    let mut next = |what: &str| {
        fields
            .next()
            .ok_or_else(|| malformed(format!("entry is missing its {what}")))
    };

    let mut location = GeoLocation {
        name: from_redis_value(next("name")?)?,
        ..GeoLocation::default()
    };
    if query.with_dist {
        location.distance = from_redis_value(next("distance")?)?;
    }
    if query.with_hash {
        location.geohash = from_redis_value(next("geohash")?)?;
    }
    if query.with_coord {
        let (longitude, latitude): (f64, f64) = from_redis_value(next("coordinates")?)?;
        location.longitude = longitude;
        location.latitude = latitude;
    }
    Ok(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::args;
    use atomkv_cache::GeoUnit;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn test_command_flags_in_order() {
        let query = GeoRadiusQuery::new(200.5)
            .with_unit(GeoUnit::Kilometers)
            .with_dist()
            .with_coord()
            .with_count(5)
            .with_sort(GeoSort::Desc);
        assert_eq!(
            args(&georadius("Sicily", 15.5, 37.5, &query)),
            [
                "GEORADIUS", "Sicily", "15.5", "37.5", "200.5", "km", "WITHCOORD", "WITHDIST",
                "COUNT", "5", "DESC",
            ]
        );

        let query = GeoRadiusQuery::new(1.5).with_unit(GeoUnit::Miles);
        assert_eq!(
            args(&georadius("Sicily", 15.5, 37.5, &query)),
            ["GEORADIUS", "Sicily", "15.5", "37.5", "1.5", "mi"]
        );
    }

    #[test]
    fn test_parse_plain_names() {
        let reply = Value::Array(vec![bulk("Palermo"), bulk("Catania")]);
        let locations = parse_radius_reply(&reply, &GeoRadiusQuery::new(200.0)).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].name, "Palermo");
        assert_eq!(locations[1].distance, 0.0);
    }

    #[test]
    fn test_parse_all_fields() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("Palermo"),
            bulk("190.4424"),
            Value::Int(3479099956230698),
            Value::Array(vec![
                bulk("13.36138933897018433"),
                bulk("38.11555639549629859"),
            ]),
        ])]);
        let query = GeoRadiusQuery::new(200.0)
            .with_dist()
            .with_hash()
            .with_coord();

        let locations = parse_radius_reply(&reply, &query).unwrap();
        let palermo = &locations[0];
        assert_eq!(palermo.name, "Palermo");
        assert!((palermo.distance - 190.4424).abs() < 1e-9);
        assert_eq!(palermo.geohash, 3479099956230698);
        assert!((palermo.longitude - 13.361389).abs() < 1e-5);
        assert!((palermo.latitude - 38.115556).abs() < 1e-5);
    }

    #[test]
    fn test_parse_coord_only() {
        let reply = Value::Array(vec![Value::Array(vec![
            bulk("Catania"),
            Value::Array(vec![bulk("15.08726745843887329"), bulk("37.50266842333162032")]),
        ])]);
        let query = GeoRadiusQuery::new(200.0).with_coord();

        let locations = parse_radius_reply(&reply, &query).unwrap();
        assert_eq!(locations[0].name, "Catania");
        assert!((locations[0].longitude - 15.087267).abs() < 1e-5);
        assert_eq!(locations[0].geohash, 0);
    }

    #[test]
    fn test_parse_rejects_short_entries() {
        let reply = Value::Array(vec![Value::Array(vec![bulk("Palermo")])]);
        let query = GeoRadiusQuery::new(200.0).with_dist();
        assert!(parse_radius_reply(&reply, &query).is_err());
        assert!(parse_radius_reply(&Value::Nil, &query).is_err());
    }
}
