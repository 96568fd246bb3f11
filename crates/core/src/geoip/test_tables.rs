//! Small IPv4 lookup tables in MaxMind DB format, written on the fly.

use std::net::Ipv4Addr;
use std::path::Path;

const METADATA_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";
const RECORD_SIZE: u16 = 24;

/// A value in the data section.
pub enum Value {
    Str(String),
    U16(u16),
    U32(u32),
    U64(u64),
    F64(f64),
    Map(Vec<(&'static str, Value)>),
    Array(Vec<Value>),
}

pub fn text(s: &str) -> Value {
    Value::Str(s.to_string())
}

/// City record with English city name, country code and coordinates.
pub fn city_record(city: &str, country_code: &str, latitude: f64, longitude: f64) -> Value {
    Value::Map(vec![
        ("city", Value::Map(vec![("names", Value::Map(vec![("en", text(city))]))])),
        ("country", Value::Map(vec![("iso_code", text(country_code))])),
        (
            "location",
            Value::Map(vec![
                ("latitude", Value::F64(latitude)),
                ("longitude", Value::F64(longitude)),
            ]),
        ),
    ])
}

pub fn asn_record(asn: u32, organization: &str) -> Value {
    Value::Map(vec![
        ("autonomous_system_number", Value::U32(asn)),
        ("autonomous_system_organization", text(organization)),
    ])
}

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Node(usize),
    Data(usize),
}

/// Write a table mapping each `(network, prefix_len)` to its record.
/// Networks must not overlap.
pub fn write_table(path: &Path, database_type: &str, networks: Vec<(Ipv4Addr, u8, Value)>) {
    let mut data = Vec::new();
    let mut nodes: Vec<[Slot; 2]> = vec![[Slot::Empty; 2]];

    for (network, prefix_len, value) in networks {
        let offset = data.len();
        encode(&value, &mut data);

        let bits = u32::from(network);
        let mut node = 0;
        for i in 0..prefix_len {
            let bit = ((bits >> (31 - i)) & 1) as usize;
            if i + 1 == prefix_len {
                nodes[node][bit] = Slot::Data(offset);
                break;
            }
            node = match nodes[node][bit] {
                Slot::Node(next) => next,
                _ => {
                    nodes.push([Slot::Empty; 2]);
                    let next = nodes.len() - 1;
                    nodes[node][bit] = Slot::Node(next);
                    next
                }
            };
        }
    }

    let node_count = nodes.len();
    let mut out = Vec::new();
    for node in &nodes {
        for slot in node {
            let record = match *slot {
                Slot::Empty => node_count,
                Slot::Node(next) => next,
                Slot::Data(offset) => node_count + 16 + offset,
            };
            assert!(record < 1 << 24);
            out.extend_from_slice(&(record as u32).to_be_bytes()[1..]);
        }
    }
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&data);

    out.extend_from_slice(METADATA_MARKER);
    let metadata = Value::Map(vec![
        ("binary_format_major_version", Value::U16(2)),
        ("binary_format_minor_version", Value::U16(0)),
        ("build_epoch", Value::U64(1_700_000_000)),
        ("database_type", text(database_type)),
        ("description", Value::Map(vec![("en", text("swarmprobe test table"))])),
        ("ip_version", Value::U16(4)),
        ("languages", Value::Array(vec![text("en")])),
        ("node_count", Value::U32(node_count as u32)),
        ("record_size", Value::U16(RECORD_SIZE)),
    ]);
    encode(&metadata, &mut out);

    std::fs::write(path, out).unwrap();
}

fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Str(s) => {
            control(out, 2, s.len());
            out.extend_from_slice(s.as_bytes());
        }
        Value::F64(f) => {
            control(out, 3, 8);
            out.extend_from_slice(&f.to_be_bytes());
        }
        Value::U16(n) => unsigned(out, 5, u64::from(*n)),
        Value::U32(n) => unsigned(out, 6, u64::from(*n)),
        Value::U64(n) => unsigned(out, 9, *n),
        Value::Map(entries) => {
            control(out, 7, entries.len());
            for (key, value) in entries {
                encode(&text(key), out);
                encode(value, out);
            }
        }
        Value::Array(items) => {
            control(out, 11, items.len());
            for item in items {
                encode(item, out);
            }
        }
    }
}

/// Big-endian with leading zero bytes dropped.
fn unsigned(out: &mut Vec<u8>, type_num: u8, n: u64) {
    let bytes = n.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    control(out, type_num, bytes.len() - skip);
    out.extend_from_slice(&bytes[skip..]);
}

/// Control byte, extended type byte and size bytes.
fn control(out: &mut Vec<u8>, type_num: u8, size: usize) {
    assert!(size < 285);
    let (low, extra) = if size < 29 {
        (size as u8, None)
    } else {
        (29, Some((size - 29) as u8))
    };
    if type_num <= 7 {
        out.push((type_num << 5) | low);
    } else {
        out.push(low);
        out.push(type_num - 7);
    }
    out.extend(extra);
}
