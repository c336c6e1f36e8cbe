#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Station id taken from the first bytes so matching paths get exercised too
    let split = data.first().map(|n| (*n as usize) % 8).unwrap_or(0).min(data.len());
    let (id, payload) = data.split_at(split);
    let station_id = String::from_utf8_lossy(id);

    if let Ok(snapshot) = endolla::feed::parse(payload, &station_id) {
        for port in snapshot.ports() {
            let _ = port.current_status();
            let _ = port.last_updated();
        }
    }
});
