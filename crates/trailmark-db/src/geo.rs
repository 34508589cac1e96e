//! Point codec for the `location` column.
//!
//! Writes go through well-known text: services hand the datastore a
//! `POINT(lng lat)` string and the insert path converts it to the stored
//! form, a hex-encoded little-endian EWKB point with SRID 4326. Reads hand
//! back the stored hex, which [`wkb_hex_to_lat_lng`] decodes to `(lat, lng)`.
//!
//! Note the coordinate order flips between the two sides: WKT is lng-lat,
//! the decoded tuple is lat-lng. That asymmetry is part of the contract.

const WKB_POINT: u32 = 1;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
const SRID_WGS84: u32 = 4326;

/// Textual point representation accepted by the datastore on write.
pub fn to_wkt(lat: f64, lng: f64) -> String {
    format!("POINT({lng} {lat})")
}

/// Parse a `POINT(lng lat)` string into `(lat, lng)`.
pub fn parse_wkt(wkt: &str) -> Option<(f64, f64)> {
    let s = wkt.trim();
    let inner = s
        .strip_prefix("POINT")?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let lng: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lat, lng))
}

/// Datastore-side conversion applied on insert/update: WKT in, hex-encoded
/// EWKB out. Returns `None` for anything that is not a two-coordinate point.
pub fn wkt_to_wkb_hex(wkt: &str) -> Option<String> {
    let (lat, lng) = parse_wkt(wkt)?;
    let mut buf = Vec::with_capacity(25);
    buf.push(1u8); // little-endian
    buf.extend_from_slice(&(WKB_POINT | EWKB_SRID_FLAG).to_le_bytes());
    buf.extend_from_slice(&SRID_WGS84.to_le_bytes());
    buf.extend_from_slice(&lng.to_le_bytes());
    buf.extend_from_slice(&lat.to_le_bytes());
    Some(hex::encode_upper(buf))
}

/// Decode a hex-encoded WKB/EWKB point into `(lat, lng)`.
///
/// Accepts either byte order, with or without the SRID block. Returns `None`
/// on absent or malformed input — callers skip the record rather than error.
pub fn wkb_hex_to_lat_lng(hex_str: &str) -> Option<(f64, f64)> {
    let bytes = hex::decode(hex_str.trim()).ok()?;

    let little_endian = match *bytes.first()? {
        0 => false,
        1 => true,
        _ => return None,
    };

    let geom_type = read_u32(&bytes, 1, little_endian)?;
    if geom_type & 0xFF != WKB_POINT {
        return None;
    }

    let coord_offset = if geom_type & EWKB_SRID_FLAG != 0 { 9 } else { 5 };
    let x = read_f64(&bytes, coord_offset, little_endian)?;
    let y = read_f64(&bytes, coord_offset + 8, little_endian)?;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    // WKB stores x=lng, y=lat; the tuple is (lat, lng)
    Some((y, x))
}

fn read_u32(bytes: &[u8], offset: usize, little_endian: bool) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(if little_endian {
        u32::from_le_bytes(raw)
    } else {
        u32::from_be_bytes(raw)
    })
}

fn read_f64(bytes: &[u8], offset: usize, little_endian: bool) -> Option<f64> {
    let raw: [u8; 8] = bytes.get(offset..offset + 8)?.try_into().ok()?;
    Some(if little_endian {
        f64::from_le_bytes(raw)
    } else {
        f64::from_be_bytes(raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(lat: f64, lng: f64) -> (f64, f64) {
        let wkt = to_wkt(lat, lng);
        let hex = wkt_to_wkb_hex(&wkt).expect("valid point");
        wkb_hex_to_lat_lng(&hex).expect("decodable point")
    }

    #[test]
    fn wkt_uses_lng_lat_order() {
        assert_eq!(to_wkt(10.5, 20.5), "POINT(20.5 10.5)");
    }

    #[test]
    fn round_trip_preserves_coordinates() {
        for &(lat, lng) in &[
            (0.0, 0.0),
            (10.5, 20.5),
            (-90.0, -180.0),
            (90.0, 180.0),
            (52.2297, 21.0122),
            (-33.8688, 151.2093),
            (0.000001, -0.000001),
        ] {
            let (out_lat, out_lng) = round_trip(lat, lng);
            assert!((out_lat - lat).abs() < 1e-9, "lat {lat} -> {out_lat}");
            assert!((out_lng - lng).abs() < 1e-9, "lng {lng} -> {out_lng}");
        }
    }

    #[test]
    fn decode_handles_plain_wkb_without_srid() {
        let mut buf = vec![1u8];
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&21.0f64.to_le_bytes());
        buf.extend_from_slice(&52.0f64.to_le_bytes());
        let decoded = wkb_hex_to_lat_lng(&hex::encode(buf)).unwrap();
        assert_eq!(decoded, (52.0, 21.0));
    }

    #[test]
    fn decode_handles_big_endian() {
        let mut buf = vec![0u8];
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&21.0f64.to_be_bytes());
        buf.extend_from_slice(&52.0f64.to_be_bytes());
        let decoded = wkb_hex_to_lat_lng(&hex::encode(buf)).unwrap();
        assert_eq!(decoded, (52.0, 21.0));
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert_eq!(wkb_hex_to_lat_lng(""), None);
        assert_eq!(wkb_hex_to_lat_lng("zzzz"), None);
        assert_eq!(wkb_hex_to_lat_lng("01"), None);
        // valid prefix, truncated coordinates
        assert_eq!(wkb_hex_to_lat_lng("0101000020E6100000"), None);
        // linestring, not a point
        let mut buf = vec![1u8];
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);
        assert_eq!(wkb_hex_to_lat_lng(&hex::encode(buf)), None);
    }

    #[test]
    fn parse_wkt_rejects_garbage() {
        assert_eq!(parse_wkt("POINT(1 2 3)"), None);
        assert_eq!(parse_wkt("POINT(1)"), None);
        assert_eq!(parse_wkt("LINESTRING(0 0, 1 1)"), None);
        assert_eq!(parse_wkt(""), None);
        assert_eq!(parse_wkt("POINT(a b)"), None);
    }
}
