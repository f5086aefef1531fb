//! Turns raw API records into [`Prospect`] values.
//!
//! Normalization is total and lossless: every record yields a prospect, and
//! every input key is either mapped onto a typed field or preserved in
//! `extras` (nested leftovers as `parent.key`). Upstream names are French
//! (`nom`, `telephones`, ...); English aliases are accepted as well.

use std::collections::BTreeMap;

use prospect_core::{Address, Attributes, Category, Contacts, GeoPoint, Prospect};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const ID: &[&str] = &["id", "entity_key"];
const NAME: &[&str] = &["nom", "name"];
const ADDRESS: &[&str] = &["adresse", "address"];
const HOUSE_NUMBER: &[&str] = &["housenumber", "house_number"];
const CATEGORY_KIND: &[&str] = &["activite_type", "activity_type"];
const CATEGORY_VALUE: &[&str] = &["activite_valeur", "activity_value", "category"];
const LAT: &[&str] = &["lat", "latitude"];
const LON: &[&str] = &["lon", "lng", "longitude"];
const EMAILS: &[&str] = &["emails", "email"];
const PHONES: &[&str] = &["telephones", "phones", "phone"];
const WHATSAPP: &[&str] = &["whatsapp"];
const WEBSITE: &[&str] = &["site", "website"];
const HOURS: &[&str] = &["horaires", "opening_hours", "hours"];
const STARS: &[&str] = &["etoiles", "stars"];
const OPERATOR: &[&str] = &["operateur", "operator"];
const BRAND: &[&str] = &["marque", "brand"];
const TAGS: &[&str] = &["raw_tags", "tags", "tags_raw"];
const PAYMENT: &[&str] = &["payment", "payment_methods"];
const SOURCE_REF: &[&str] = &["osm", "osm_url", "source_url"];

/// A raw result record exactly as the API sent it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Objects are used as-is; `null` is an empty record; any other value is
/// kept under the `value` key.
impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            Value::Null => Self::default(),
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_owned(), other);
                Self(fields)
            }
        }
    }
}

/// Normalizes one record. Never fails.
#[must_use]
pub fn normalize(raw: impl Into<RawRecord>) -> Prospect {
    let mut reader = FieldReader::new(raw.into().0, None);

    let explicit_id = reader.text(ID);
    let name = reader.text(NAME).unwrap_or_default();
    let address = read_address(&mut reader);
    let category = Category {
        kind: reader.text(CATEGORY_KIND),
        value: reader.text(CATEGORY_VALUE),
    };
    let position = read_position(&mut reader);

    let contacts = Contacts {
        emails: reader.list(EMAILS),
        phones: reader.list(PHONES),
        whatsapp: reader.list(WHATSAPP),
        website: reader.text(WEBSITE),
    };
    let attributes = Attributes {
        hours: reader.text(HOURS),
        cuisine: reader.text(&["cuisine"]),
        stars: reader.text(STARS),
        operator: reader.text(OPERATOR),
        brand: reader.text(BRAND),
    };

    let tags_raw = reader.string_map(TAGS);
    let mut payment_methods = reader.string_map(PAYMENT);
    for (key, value) in &tags_raw {
        if let Some(method) = key.strip_prefix("payment:") {
            payment_methods
                .entry(method.to_owned())
                .or_insert_with(|| value.clone());
        }
    }
    let source_ref = reader.text(SOURCE_REF);
    let distance_km = read_distance(&mut reader);

    let id = explicit_id
        .or_else(|| source_ref.clone())
        .unwrap_or_else(|| synthesize_id(position, &name));
    let contact_method_count = contacts.method_count();

    Prospect {
        id,
        name,
        address,
        category,
        position,
        contacts,
        attributes,
        tags_raw,
        extras: reader.finish(),
        payment_methods,
        source_ref,
        distance_km,
        contact_method_count,
    }
}

/// Normalizes a batch, preserving order.
#[must_use]
pub fn normalize_all(records: Vec<Value>) -> Vec<Prospect> {
    records.into_iter().map(normalize).collect()
}

fn read_address(reader: &mut FieldReader) -> Address {
    let mut house_number = None;
    let mut street = None;
    let mut postcode = None;
    let mut city = None;
    let mut raw_full = None;

    match reader.take_first(ADDRESS) {
        Some((key, Value::Object(fields))) => {
            let mut nested = FieldReader::new(fields, Some(key.as_str()));
            house_number = nested.text(HOUSE_NUMBER);
            street = nested.text(&["street"]);
            postcode = nested.text(&["postcode"]);
            city = nested.text(&["city"]);
            raw_full = nested.text(&["full"]);
            reader.absorb(nested);
        }
        Some((key, value)) => match scalar_text(&value) {
            Some(text) => raw_full = Some(text),
            None => reader.preserve(&key, &value),
        },
        None => {}
    }

    // Light view flattens the address onto the record itself.
    merge_flat(reader, &mut house_number, HOUSE_NUMBER);
    merge_flat(reader, &mut street, &["street"]);
    merge_flat(reader, &mut postcode, &["postcode"]);
    merge_flat(reader, &mut city, &["city"]);

    Address::compose(house_number, street, postcode, city, raw_full)
}

fn merge_flat(reader: &mut FieldReader, slot: &mut Option<String>, aliases: &[&str]) {
    let Some((key, value)) = reader.take_first(aliases) else {
        return;
    };
    match scalar_text(&value) {
        Some(text) if slot.is_none() => *slot = Some(text),
        Some(text) if slot.as_deref() == Some(text.as_str()) => {}
        _ => reader.preserve(&key, &value),
    }
}

fn read_position(reader: &mut FieldReader) -> Option<GeoPoint> {
    let lat = reader.take_first(LAT);
    let lon = reader.take_first(LON);

    let coords = match (&lat, &lon) {
        (Some((_, lat)), Some((_, lon))) => scalar_number(lat).zip(scalar_number(lon)),
        _ => None,
    };
    if let Some((lat, lon)) = coords {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
            return Some(GeoPoint { lat, lon });
        }
    }

    for (key, value) in lat.iter().chain(lon.iter()) {
        reader.preserve(key, value);
    }
    None
}

fn read_distance(reader: &mut FieldReader) -> Option<f64> {
    let mut distance = None;
    if let Some((key, value)) = reader.take_first(&["distance_km"]) {
        distance = scalar_number(&value).filter(|d| *d >= 0.0);
        if distance.is_none() {
            reader.preserve(&key, &value);
        }
    }

    match reader.take_first(&["sales"]) {
        Some((key, Value::Object(fields))) => {
            let mut sales = FieldReader::new(fields, Some(key.as_str()));
            if distance.is_none() {
                if let Some((inner_key, value)) = sales.take_first(&["distance_km"]) {
                    distance = scalar_number(&value).filter(|d| *d >= 0.0);
                    if distance.is_none() {
                        sales.preserve(&inner_key, &value);
                    }
                }
            }
            reader.absorb(sales);
        }
        Some((key, value)) => reader.preserve(&key, &value),
        None => {}
    }
    distance
}

/// Stable key for records without an id: digest of position and name.
fn synthesize_id(position: Option<GeoPoint>, name: &str) -> String {
    let (lat, lon) = position.map_or((String::new(), String::new()), |p| {
        (p.lat.to_string(), p.lon.to_string())
    });
    let input = format!("{lat}\x00{lon}\x00{}", name.trim().to_lowercase());
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));
    format!("syn-{}", &digest[..16])
}

/// Consumes fields out of a JSON object, collecting everything it cannot
/// map into `extras`.
struct FieldReader {
    fields: Map<String, Value>,
    prefix: Option<String>,
    extras: BTreeMap<String, String>,
}

impl FieldReader {
    fn new(fields: Map<String, Value>, prefix: Option<&str>) -> Self {
        Self {
            fields,
            prefix: prefix.map(str::to_owned),
            extras: BTreeMap::new(),
        }
    }

    fn extras_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_owned(),
        }
    }

    /// Stores `value` in `extras`, verbatim for strings and as JSON text
    /// otherwise.
    fn preserve(&mut self, key: &str, value: &Value) {
        let key = self.extras_key(key);
        self.extras.insert(key, stringify(value));
    }

    /// Removes every alias; returns the first non-null one and preserves
    /// the others.
    fn take_first(&mut self, aliases: &[&str]) -> Option<(String, Value)> {
        let mut chosen = None;
        for alias in aliases {
            match self.fields.remove(*alias) {
                None | Some(Value::Null) => {}
                Some(value) if chosen.is_none() => chosen = Some(((*alias).to_owned(), value)),
                Some(value) => self.preserve(alias, &value),
            }
        }
        chosen
    }

    fn text(&mut self, aliases: &[&str]) -> Option<String> {
        let (key, value) = self.take_first(aliases)?;
        if let Some(text) = scalar_text(&value) {
            return Some(text);
        }
        if !matches!(&value, Value::String(_)) {
            self.preserve(&key, &value);
        }
        None
    }

    /// Merges every alias into one list. Strings are split on `;` and `,`;
    /// duplicates are dropped keeping the first occurrence.
    fn list(&mut self, aliases: &[&str]) -> Vec<String> {
        let mut items: Vec<String> = Vec::new();
        for alias in aliases {
            let Some(value) = self.fields.remove(*alias) else {
                continue;
            };
            let mut usable = true;
            match &value {
                Value::Null => {}
                Value::String(s) => push_split(&mut items, s),
                Value::Number(n) => push_unique(&mut items, n.to_string()),
                Value::Array(elements) => {
                    for element in elements {
                        match element {
                            Value::String(s) => push_split(&mut items, s),
                            Value::Number(n) => push_unique(&mut items, n.to_string()),
                            Value::Null => {}
                            _ => usable = false,
                        }
                    }
                }
                Value::Bool(_) | Value::Object(_) => usable = false,
            }
            if !usable {
                self.preserve(alias, &value);
            }
        }
        items
    }

    /// Reads an object of scalars into a string map.
    fn string_map(&mut self, aliases: &[&str]) -> BTreeMap<String, String> {
        match self.take_first(aliases) {
            Some((_, Value::Object(fields))) => fields
                .into_iter()
                .map(|(k, v)| (k, stringify(&v)))
                .collect(),
            Some((key, value)) => {
                self.preserve(&key, &value);
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        }
    }

    /// Folds a nested reader's leftovers and extras into this one.
    fn absorb(&mut self, nested: FieldReader) {
        self.extras.extend(nested.finish());
    }

    /// Remaining fields plus everything preserved along the way.
    fn finish(mut self) -> BTreeMap<String, String> {
        let leftovers = std::mem::take(&mut self.fields);
        for (key, value) in leftovers {
            self.preserve(&key, &value);
        }
        self.extras
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Trimmed text for non-blank strings, numbers and booleans.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Finite number from a JSON number or a numeric string.
fn scalar_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn push_split(items: &mut Vec<String>, raw: &str) {
    for part in raw.split([';', ',']) {
        let part = part.trim();
        if !part.is_empty() {
            push_unique(items, part.to_owned());
        }
    }
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
