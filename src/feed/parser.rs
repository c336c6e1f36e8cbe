//! Station extraction from a full feed document.

use serde_json::Value;

use super::error::ParseOutcome;
use super::types::StationSnapshot;

fn children<'a>(node: &'a Value, key: &str) -> &'a [Value] {
    node.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Locate the raw record of `station_id`, scanning `locations[*].stations[*]`
///
/// Matching is exact equality against a string `id`; the first match in
/// document order wins.
pub fn find_station<'a>(document: &'a Value, station_id: &str) -> Option<&'a Value> {
    children(document, "locations")
        .iter()
        .flat_map(|location| children(location, "stations"))
        .find(|station| station.get("id").and_then(Value::as_str) == Some(station_id))
}

/// Decode a feed payload and extract the snapshot of one station
pub fn parse(bytes: &[u8], station_id: &str) -> Result<StationSnapshot, ParseOutcome> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| ParseOutcome::Malformed(e.to_string()))?;

    if !document.is_object() {
        return Err(ParseOutcome::Malformed(
            "expected a JSON object at the document root".to_string(),
        ));
    }

    let station = find_station(&document, station_id).ok_or(ParseOutcome::NotFound)?;

    StationSnapshot::from_raw(station.clone())
        .map_err(|e| ParseOutcome::Malformed(format!("station {station_id}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed() -> Value {
        json!({
            "locations": [
                {
                    "id": "L1",
                    "stations": [
                        {"id": "S1", "ports": [{"id": "P1", "port_status": [{"status": "AVAILABLE"}]}]},
                        {"id": "S2", "ports": []}
                    ]
                },
                {
                    "id": "L2",
                    "stations": [
                        {"id": "S3", "extra": {"nested": [1, 2, 3]}, "ports": [
                            {"id": "P9", "port_status": [{"status": "IN_USE", "since": "x"}], "last_updated": "2024-05-01T10:00:00"}
                        ]}
                    ]
                }
            ]
        })
    }

    fn bytes(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn returns_exact_station_record() {
        let doc = feed();
        let snapshot = parse(&bytes(&doc), "S3").unwrap();
        assert_eq!(snapshot.raw(), &doc["locations"][1]["stations"][0]);
        assert_eq!(snapshot.ports()[0].current_status(), "IN_USE");
    }

    #[test]
    fn absent_station_is_not_found() {
        assert_eq!(parse(&bytes(&feed()), "S404"), Err(ParseOutcome::NotFound));
    }

    #[test]
    fn missing_hierarchy_levels_are_empty() {
        assert_eq!(parse(b"{}", "S1"), Err(ParseOutcome::NotFound));
        assert_eq!(
            parse(br#"{"locations": [{"id": "L1"}]}"#, "S1"),
            Err(ParseOutcome::NotFound)
        );
        assert_eq!(
            parse(br#"{"locations": null}"#, "S1"),
            Err(ParseOutcome::NotFound)
        );
    }

    #[test]
    fn non_json_is_malformed() {
        let payloads: [&[u8]; 4] = [b"<html>503</html>", b"", b"{\"locations\": [", b"\xff\xfe"];
        for payload in payloads {
            assert!(matches!(
                parse(payload, "S1"),
                Err(ParseOutcome::Malformed(_))
            ));
        }
    }

    #[test]
    fn non_object_root_is_malformed() {
        assert!(matches!(
            parse(b"[1, 2, 3]", "S1"),
            Err(ParseOutcome::Malformed(_))
        ));
    }

    #[test]
    fn station_without_ports_has_empty_port_list() {
        let doc = json!({"locations": [{"stations": [{"id": "S1"}]}]});
        let snapshot = parse(&bytes(&doc), "S1").unwrap();
        assert!(snapshot.ports().is_empty());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn badly_typed_ports_are_malformed() {
        let doc = json!({"locations": [{"stations": [{"id": "S1", "ports": "none"}]}]});
        assert!(matches!(
            parse(&bytes(&doc), "S1"),
            Err(ParseOutcome::Malformed(_))
        ));
    }

    #[test]
    fn one_badly_typed_port_does_not_fail_the_station() {
        let doc = json!({"locations": [{"stations": [{"id": "S1", "ports": [
            {"id": "1", "port_status": [{"status": "IN_USE"}]},
            {"id": "2", "port_status": "AVAILABLE"}
        ]}]}]});
        let snapshot = parse(&bytes(&doc), "S1").unwrap();
        assert_eq!(snapshot.port("1").unwrap().current_status(), "IN_USE");
        assert_eq!(snapshot.port("2").unwrap().current_status(), "UNKNOWN");
    }

    #[test]
    fn null_port_elements_are_skipped() {
        let doc = json!({"locations": [{"stations": [{"id": "S1", "ports": [
            null,
            {"id": "1", "port_status": [{"status": "OUT_OF_ORDER"}]}
        ]}]}]});
        let snapshot = parse(&bytes(&doc), "S1").unwrap();
        assert_eq!(snapshot.ports().len(), 1);
        assert_eq!(snapshot.port("1").unwrap().current_status(), "OUT_OF_ORDER");
    }

    #[test]
    fn first_duplicate_station_wins() {
        let doc = json!({"locations": [
            {"stations": [{"id": "S1", "tag": "first"}]},
            {"stations": [{"id": "S1", "tag": "second"}]}
        ]});
        let snapshot = parse(&bytes(&doc), "S1").unwrap();
        assert_eq!(snapshot.raw()["tag"], "first");
    }

    #[test]
    fn numeric_station_ids_do_not_match_text() {
        let doc = json!({"locations": [{"stations": [{"id": 42}]}]});
        assert_eq!(parse(&bytes(&doc), "42"), Err(ParseOutcome::NotFound));
    }
}
