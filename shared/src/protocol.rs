//! Length-prefixed text protocol.
//!
//! A frame is `LENOFLEN` ASCII digits giving the width of the length field,
//! that many digits giving the payload length, then the UTF-8 payload.
//! Payloads are `TYPE SEP key:value SEP key:value ...`:
//!
//! - `M` (server to client): `id` is the recipient's player id, `tiles` is every
//!   cell row-major as `xxyyaaaaaot` records joined by `&`.
//! - `P` (client to server): `coordinates` is `fromX&fromY&toX&toY`.

use crate::{Coord, Move, PlayerId, Tile, TileKind};

pub const LENOFLEN: usize = 2;
pub const SEP: &str = "\r\n";
pub const RECORD_SEP: &str = "&";
pub const KEY_SEP: char = ':';
pub const MAX_PAYLOAD_LEN: usize = 1 << 20;
/// Widest army count a 5-digit record can carry.
pub const MAX_WIRE_ARMY: u32 = 99_999;

const MAX_LEN_DIGITS: usize = 7;
const COORD_WIDTH: usize = 2;
const ARMY_WIDTH: usize = 5;
const OWNER_WIDTH: usize = 1;
const TILE_RECORD_LEN: usize = 2 * COORD_WIDTH + ARMY_WIDTH + OWNER_WIDTH + 1;

const SNAPSHOT_TYPE: &str = "M";
const ACTION_TYPE: &str = "P";
const ID_KEY: &str = "id";
const TILES_KEY: &str = "tiles";
const COORDINATES_KEY: &str = "coordinates";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame truncated after {0} bytes")]
    Truncated(usize),
    #[error("bad length prefix {0:?}")]
    BadLengthPrefix(String),
    #[error("declared payload of {0} bytes is too large")]
    PayloadTooLarge(usize),
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("unknown message type {0:?}")]
    UnknownType(String),
    #[error("missing field {0:?}")]
    MissingField(&'static str),
    #[error("malformed field {0:?}")]
    MalformedField(String),
    #[error("bad tile record {0:?}")]
    BadTileRecord(String),
    #[error("bad coordinates {0:?}")]
    BadCoordinates(String),
    #[error("{0} unexpected bytes after frame")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Fog-filtered view of the whole grid for one player.
    Snapshot {
        recipient: PlayerId,
        tiles: Vec<(Coord, Tile)>,
    },
    Action(Move),
}

impl Message {
    pub fn action(from: Coord, to: Coord) -> Self {
        Message::Action(Move::new(from, to))
    }

    pub fn encode_payload(&self) -> String {
        match self {
            Message::Snapshot { recipient, tiles } => {
                let records: Vec<String> = tiles
                    .iter()
                    .map(|(coord, tile)| encode_tile_record(*coord, tile))
                    .collect();
                format!(
                    "{SNAPSHOT_TYPE}{SEP}{ID_KEY}{KEY_SEP}{recipient}{SEP}{TILES_KEY}{KEY_SEP}{}",
                    records.join(RECORD_SEP)
                )
            }
            Message::Action(mv) => format!(
                "{ACTION_TYPE}{SEP}{COORDINATES_KEY}{KEY_SEP}\
                 {:02}{RECORD_SEP}{:02}{RECORD_SEP}{:02}{RECORD_SEP}{:02}",
                mv.from.x, mv.from.y, mv.to.x, mv.to.y
            ),
        }
    }

    pub fn decode_payload(payload: &str) -> Result<Self, DecodeError> {
        let mut parts = payload.split(SEP);
        let kind = parts.next().unwrap_or_default();
        let fields = parts
            .map(|raw| {
                raw.split_once(KEY_SEP)
                    .ok_or_else(|| DecodeError::MalformedField(raw.to_string()))
            })
            .collect::<Result<Vec<(&str, &str)>, DecodeError>>()?;

        match kind {
            SNAPSHOT_TYPE => decode_snapshot(&fields),
            ACTION_TYPE => decode_action(&fields),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    pub fn to_frame(&self) -> Vec<u8> {
        encode_frame(&self.encode_payload())
    }

    /// Decodes exactly one complete frame.
    pub fn from_frame(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (payload, used) =
            split_frame(bytes)?.ok_or(DecodeError::Truncated(bytes.len()))?;
        if used != bytes.len() {
            return Err(DecodeError::TrailingBytes(bytes.len() - used));
        }
        let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
        Self::decode_payload(text)
    }
}

pub fn encode_frame(payload: &str) -> Vec<u8> {
    let length = payload.len().to_string();
    let mut frame = format!("{:0width$}{}", length.len(), length, width = LENOFLEN).into_bytes();
    frame.extend_from_slice(payload.as_bytes());
    frame
}

/// Splits the first frame off `buf`.
///
/// Returns `Ok(None)` while the buffer holds only part of a frame, otherwise the
/// payload and the number of bytes the frame occupied.
pub fn split_frame(buf: &[u8]) -> Result<Option<(&[u8], usize)>, DecodeError> {
    if buf.len() < LENOFLEN {
        return Ok(None);
    }
    let width = parse_len_of_len(&buf[..LENOFLEN])?;

    let header_end = LENOFLEN + width;
    if buf.len() < header_end {
        return Ok(None);
    }
    let payload_len = parse_payload_len(&buf[LENOFLEN..header_end])?;

    let end = header_end + payload_len;
    if buf.len() < end {
        return Ok(None);
    }
    Ok(Some((&buf[header_end..end], end)))
}

pub(crate) fn parse_len_of_len(digits: &[u8]) -> Result<usize, DecodeError> {
    match parse_digits(digits) {
        Some(width) if (1..=MAX_LEN_DIGITS).contains(&width) => Ok(width),
        _ => Err(bad_prefix(digits)),
    }
}

pub(crate) fn parse_payload_len(digits: &[u8]) -> Result<usize, DecodeError> {
    let len = parse_digits(digits).ok_or_else(|| bad_prefix(digits))?;
    if len > MAX_PAYLOAD_LEN {
        return Err(DecodeError::PayloadTooLarge(len));
    }
    Ok(len)
}

fn bad_prefix(digits: &[u8]) -> DecodeError {
    DecodeError::BadLengthPrefix(String::from_utf8_lossy(digits).into_owned())
}

/// Unsigned decimal made only of ASCII digits; no sign, no whitespace.
fn parse_digits(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0usize, |acc, b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(usize::from(b - b'0'))
    })
}

fn encode_tile_record(coord: Coord, tile: &Tile) -> String {
    format!(
        "{:02}{:02}{:05}{:01}{}",
        coord.x,
        coord.y,
        tile.army.min(MAX_WIRE_ARMY),
        tile.owner.min(9),
        tile.kind.code()
    )
}

fn decode_tile_record(record: &str) -> Result<(Coord, Tile), DecodeError> {
    let bad = || DecodeError::BadTileRecord(record.to_string());
    let bytes = record.as_bytes();
    if bytes.len() != TILE_RECORD_LEN || !record.is_ascii() {
        return Err(bad());
    }

    let (x, rest) = bytes.split_at(COORD_WIDTH);
    let (y, rest) = rest.split_at(COORD_WIDTH);
    let (army, rest) = rest.split_at(ARMY_WIDTH);
    let (owner, code) = rest.split_at(OWNER_WIDTH);

    let x = parse_digits(x).ok_or_else(bad)?;
    let y = parse_digits(y).ok_or_else(bad)?;
    let army = parse_digits(army).ok_or_else(bad)? as u32;
    let owner = parse_digits(owner).ok_or_else(bad)? as PlayerId;
    let kind = TileKind::from_code(char::from(code[0])).ok_or_else(bad)?;

    Ok((Coord::new(x, y), Tile::new(kind, owner, army)))
}

fn field<'a>(fields: &[(&str, &'a str)], key: &'static str) -> Result<&'a str, DecodeError> {
    fields
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or(DecodeError::MissingField(key))
}

fn decode_snapshot(fields: &[(&str, &str)]) -> Result<Message, DecodeError> {
    let id = field(fields, ID_KEY)?;
    let recipient = parse_digits(id.as_bytes())
        .and_then(|n| PlayerId::try_from(n).ok())
        .ok_or_else(|| DecodeError::MalformedField(format!("{ID_KEY}{KEY_SEP}{id}")))?;

    let raw_tiles = field(fields, TILES_KEY)?;
    let tiles = if raw_tiles.is_empty() {
        Vec::new()
    } else {
        raw_tiles
            .split(RECORD_SEP)
            .map(decode_tile_record)
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Message::Snapshot { recipient, tiles })
}

fn decode_action(fields: &[(&str, &str)]) -> Result<Message, DecodeError> {
    let raw = field(fields, COORDINATES_KEY)?;
    let bad = || DecodeError::BadCoordinates(raw.to_string());

    let values = raw
        .split(RECORD_SEP)
        .map(|part| {
            if part.len() != COORD_WIDTH {
                return None;
            }
            parse_digits(part.as_bytes())
        })
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(bad)?;

    match values.as_slice() {
        [fx, fy, tx, ty] => Ok(Message::action(Coord::new(*fx, *fy), Coord::new(*tx, *ty))),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NEUTRAL;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn sample_snapshot() -> Message {
        Message::Snapshot {
            recipient: 1,
            tiles: vec![
                (Coord::new(0, 0), Tile::king(1, 12)),
                (Coord::new(1, 0), Tile::mountain()),
                (Coord::new(0, 1), Tile::neutral()),
                (Coord::new(1, 1), Tile::new(TileKind::City, 2, 41)),
            ],
        }
    }

    #[test]
    fn test_snapshot_payload_layout() {
        let payload = sample_snapshot().encode_payload();
        assert_eq!(
            payload,
            "M\r\nid:1\r\ntiles:0000000121K&0100000000M&0001000010A&0101000412C"
        );
    }

    #[test]
    fn test_action_payload_layout() {
        let payload = Message::action(Coord::new(1, 2), Coord::new(1, 3)).encode_payload();
        assert_eq!(payload, "P\r\ncoordinates:01&02&01&03");
    }

    #[test]
    fn test_frame_header() {
        let frame = Message::action(Coord::new(1, 2), Coord::new(1, 3)).to_frame();
        let text = String::from_utf8(frame).unwrap();
        assert_eq!(text, "0226P\r\ncoordinates:01&02&01&03");
    }

    #[test]
    fn test_frame_header_for_long_payload() {
        let payload = "x".repeat(12_345);
        let frame = encode_frame(&payload);
        assert_eq!(&frame[..7], b"0512345");
        assert_eq!(frame.len(), 7 + 12_345);
    }

    #[test]
    fn test_snapshot_decodes_back() {
        let message = sample_snapshot();
        let decoded = Message::from_frame(&message.to_frame()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_action_decodes_back() {
        let message = Message::action(Coord::new(24, 19), Coord::new(23, 19));
        assert_eq!(Message::from_frame(&message.to_frame()).unwrap(), message);
    }

    #[test]
    fn test_army_saturates_on_the_wire() {
        let message = Message::Snapshot {
            recipient: 2,
            tiles: vec![(Coord::new(0, 0), Tile::king(2, 250_000))],
        };
        match Message::from_frame(&message.to_frame()).unwrap() {
            Message::Snapshot { tiles, .. } => assert_eq!(tiles[0].1.army, MAX_WIRE_ARMY),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_empty_tiles_field() {
        let decoded = Message::decode_payload("M\r\nid:3\r\ntiles:").unwrap();
        assert_eq!(
            decoded,
            Message::Snapshot {
                recipient: 3,
                tiles: Vec::new()
            }
        );
    }

    #[test]
    fn test_field_order_and_unknown_keys() {
        let decoded = Message::decode_payload("P\r\nseq:9\r\ncoordinates:00&00&00&01").unwrap();
        assert_eq!(decoded, Message::action(Coord::new(0, 0), Coord::new(0, 1)));
    }

    #[test]
    fn test_split_frame_incomplete() {
        let frame = Message::action(Coord::new(1, 2), Coord::new(1, 3)).to_frame();
        for cut in 0..frame.len() {
            assert_eq!(split_frame(&frame[..cut]), Ok(None), "cut at {}", cut);
        }
        let (payload, used) = split_frame(&frame).unwrap().unwrap();
        assert_eq!(used, frame.len());
        assert!(payload.starts_with(b"P\r\n"));
    }

    #[test]
    fn test_split_frame_leaves_following_frame() {
        let mut bytes = Message::action(Coord::new(0, 0), Coord::new(1, 0)).to_frame();
        let first_len = bytes.len();
        bytes.extend(Message::action(Coord::new(1, 0), Coord::new(2, 0)).to_frame());

        let (_, used) = split_frame(&bytes).unwrap().unwrap();
        assert_eq!(used, first_len);
        let second = Message::from_frame(&bytes[used..]).unwrap();
        assert_eq!(second, Message::action(Coord::new(1, 0), Coord::new(2, 0)));
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let frame = sample_snapshot().to_frame();
        let result = Message::from_frame(&frame[..frame.len() - 1]);
        assert_eq!(result, Err(DecodeError::Truncated(frame.len() - 1)));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut frame = sample_snapshot().to_frame();
        frame.push(b'!');
        assert_eq!(Message::from_frame(&frame), Err(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn test_garbage_headers() {
        assert!(matches!(
            Message::from_frame(b"ab12P"),
            Err(DecodeError::BadLengthPrefix(_))
        ));
        assert!(matches!(
            Message::from_frame(b"00P"),
            Err(DecodeError::BadLengthPrefix(_))
        ));
        assert!(matches!(
            Message::from_frame(b"02-1P"),
            Err(DecodeError::BadLengthPrefix(_))
        ));
        assert!(matches!(
            Message::from_frame(b"079999999"),
            Err(DecodeError::PayloadTooLarge(9_999_999))
        ));
        assert_eq!(Message::from_frame(b""), Err(DecodeError::Truncated(0)));
    }

    #[test]
    fn test_non_utf8_payload() {
        let mut frame = b"012".to_vec();
        frame.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(Message::from_frame(&frame), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(
            Message::decode_payload("Q\r\nid:1"),
            Err(DecodeError::UnknownType("Q".to_string()))
        );
        assert_eq!(
            Message::decode_payload("P\r\ncoordinates"),
            Err(DecodeError::MalformedField("coordinates".to_string()))
        );
        assert_eq!(
            Message::decode_payload("P"),
            Err(DecodeError::MissingField("coordinates"))
        );
        assert!(matches!(
            Message::decode_payload("P\r\ncoordinates:1&2&3&4"),
            Err(DecodeError::BadCoordinates(_))
        ));
        assert!(matches!(
            Message::decode_payload("P\r\ncoordinates:01&02&03"),
            Err(DecodeError::BadCoordinates(_))
        ));
        assert!(matches!(
            Message::decode_payload("P\r\ncoordinates:01&02&+3&04"),
            Err(DecodeError::BadCoordinates(_))
        ));
        assert!(matches!(
            Message::decode_payload("M\r\nid:x\r\ntiles:"),
            Err(DecodeError::MalformedField(_))
        ));
        assert!(matches!(
            Message::decode_payload("M\r\nid:1\r\ntiles:0000000121X"),
            Err(DecodeError::BadTileRecord(_))
        ));
        assert!(matches!(
            Message::decode_payload("M\r\nid:1\r\ntiles:000000121K"),
            Err(DecodeError::BadTileRecord(_))
        ));
        assert_eq!(
            Message::decode_payload("M\r\ntiles:"),
            Err(DecodeError::MissingField("id"))
        );
    }

    #[test]
    fn test_random_bytes_never_panic() {
        const ALPHABET: &[u8] = b"0123456789PM:&\r\nAKCx\xff";
        let mut rng = StdRng::seed_from_u64(0xF0F0);
        let valid = sample_snapshot().to_frame();

        for round in 0..2_000 {
            let bytes: Vec<u8> = if round % 2 == 0 {
                let len = rng.gen_range(0..64);
                (0..len)
                    .map(|_| *ALPHABET.choose(&mut rng).unwrap())
                    .collect()
            } else {
                // Valid frame with a few bytes flipped.
                let mut bytes = valid.clone();
                for _ in 0..rng.gen_range(1..4) {
                    let at = rng.gen_range(0..bytes.len());
                    bytes[at] = rng.gen();
                }
                bytes
            };

            let _ = Message::from_frame(&bytes);
            if let Ok(Some((payload, used))) = split_frame(&bytes) {
                assert!(used <= bytes.len());
                assert!(payload.len() < used);
            }
        }
    }

    #[test]
    fn test_neutral_owner_digit() {
        let record = encode_tile_record(Coord::new(7, 9), &Tile::city(40));
        assert_eq!(record, "0709000400C");
        let (coord, tile) = decode_tile_record(&record).unwrap();
        assert_eq!(coord, Coord::new(7, 9));
        assert_eq!(tile.owner, NEUTRAL);
        assert_eq!(tile.army, 40);
    }
}
