//! Outbound request builders for the server protocol.
//!
//! Every command the bridge can send, pre-serialized to the single-
//! letter wire fields. Builders return the frame text directly since
//! JSON objects of literals cannot fail to serialize.

use serde_json::{json, Value};

/// Asks the server for the waiting-tile login challenge.
pub fn request_login_challenge() -> String {
    json!({"m": 1, "r": 10}).to_string()
}

/// Answers the login challenge with credentials and the solved tiles.
pub fn login(
    username: &str,
    password: &str,
    question: &str,
    answer: &str,
) -> String {
    json!({
        "m": 1,
        "r": 9,
        "u": username,
        "p": password,
        "z": question,
        "s": answer,
    })
    .to_string()
}

/// Requests the full room list.
pub fn room_list() -> String {
    json!({"m": 1, "r": 2}).to_string()
}

/// Requests a seat in a room. The password field is omitted entirely
/// when the room has none.
pub fn join_room(room_id: u64, seat: u64, password: Option<&str>) -> String {
    let mut packet = json!({"m": 1, "r": 4, "v": room_id, "s": seat});
    if let (Some(password), Value::Object(map)) = (password, &mut packet) {
        map.insert("p".to_owned(), Value::from(password));
    }
    packet.to_string()
}

/// Leaves the current room.
pub fn exit_room() -> String {
    json!({"m": 1, "r": 5}).to_string()
}

/// Confirms readiness after taking a seat.
pub fn ready() -> String {
    json!({"m": 1, "r": 6, "v": 1}).to_string()
}

/// Heartbeat stamped with the send timestamp the echo must match.
pub fn heartbeat(timestamp: u64) -> String {
    json!({"m": 5, "t": timestamp}).to_string()
}

/// Discards the given tile (protocol-minimum default while the agent
/// is not ready).
pub fn discard(tile: u64) -> String {
    json!({"m": 2, "r": 2, "v": tile}).to_string()
}

/// Declines whatever option the server offered.
pub fn decline() -> String {
    json!({"m": 2, "r": 9, "v": 0}).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).expect("builders emit valid JSON")
    }

    #[test]
    fn test_login_carries_challenge_and_answer() {
        let v = parse(&login("bot-a", "secret", "1112223334", "4"));
        assert_eq!(v["m"], 1);
        assert_eq!(v["r"], 9);
        assert_eq!(v["u"], "bot-a");
        assert_eq!(v["p"], "secret");
        assert_eq!(v["z"], "1112223334");
        assert_eq!(v["s"], "4");
    }

    #[test]
    fn test_join_room_omits_missing_password() {
        let open = parse(&join_room(42, 2, None));
        assert_eq!(open["v"], 42);
        assert_eq!(open["s"], 2);
        assert!(open.get("p").is_none());

        let locked = parse(&join_room(42, 2, Some("hunter2")));
        assert_eq!(locked["p"], "hunter2");
    }

    #[test]
    fn test_heartbeat_echoable_timestamp() {
        let v = parse(&heartbeat(171_717));
        assert_eq!(v["m"], 5);
        assert_eq!(v["t"], 171_717);
    }

    #[test]
    fn test_gameplay_defaults() {
        let v = parse(&discard(0x42));
        assert_eq!(v["m"], 2);
        assert_eq!(v["r"], 2);
        assert_eq!(v["v"], 0x42);

        let v = parse(&decline());
        assert_eq!(v["r"], 9);
        assert_eq!(v["v"], 0);
    }

    #[test]
    fn test_simple_requests() {
        assert_eq!(parse(&room_list())["r"], 2);
        assert_eq!(parse(&exit_room())["r"], 5);
        assert_eq!(parse(&ready())["v"], 1);
        assert_eq!(parse(&request_login_challenge())["r"], 10);
    }
}
