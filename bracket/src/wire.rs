/// Lenient accessors over untyped bracket payloads.
/// Backends disagree on key casing, so every lookup takes a list of accepted keys.
use serde_json::Value;

pub(crate) const QUARTER_FINAL_KEYS: &[&str] =
    &["quarterFinals", "quarterfinals", "quarter_finals", "QuarterFinals"];
pub(crate) const SEMI_FINAL_KEYS: &[&str] =
    &["semiFinals", "semifinals", "semi_finals", "SemiFinals"];
pub(crate) const FINAL_KEYS: &[&str] = &["final", "Final", "finalMatch", "final_match"];
pub(crate) const THIRD_PLACE_KEYS: &[&str] =
    &["thirdPlace", "thirdplace", "third_place", "ThirdPlace"];

pub(crate) const MATCH_ID_KEYS: &[&str] = &["matchId", "match_id", "id", "_id"];
pub(crate) const MATCH_NUMBER_KEYS: &[&str] = &["match", "matchNumber", "match_number", "number"];
pub(crate) const TEAM1_KEYS: &[&str] = &["team1", "Team1", "team_1", "home"];
pub(crate) const TEAM2_KEYS: &[&str] = &["team2", "Team2", "team_2", "away"];
pub(crate) const WINNER_KEYS: &[&str] = &["winner", "Winner"];
pub(crate) const WINNER_ID_KEYS: &[&str] = &["winnerId", "winner_id"];
pub(crate) const STATUS_KEYS: &[&str] = &["status", "Status", "state"];

pub(crate) const TEAM_ID_KEYS: &[&str] = &["teamId", "team_id", "id", "_id"];
pub(crate) const TEAM_NAME_KEYS: &[&str] = &["name", "teamName", "team_name"];
pub(crate) const TEAM_LOGO_KEYS: &[&str] = &["logo", "logoUrl", "logo_url"];
pub(crate) const TEAM_SCORE_KEYS: &[&str] = &["score", "goals"];

/// First present, non-null value under any of `keys`.
pub(crate) fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = value.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|v| !v.is_null())
}

/// Strings are trimmed; numbers are accepted as their decimal form.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub(crate) fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys).and_then(as_text)
}

/// Non-negative integers, also when sent as numeric strings.
pub(crate) fn u32_field(value: &Value, keys: &[&str]) -> Option<u32> {
    match field(value, keys)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Array items under any of `keys`; anything that is not an array reads as empty.
pub(crate) fn array_field<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    field(value, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
