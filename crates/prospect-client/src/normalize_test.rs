use serde_json::json;

use super::*;

fn full_record() -> Value {
    json!({
        "nom": "Le Petit Zinc",
        "activite_type": "amenity",
        "activite_valeur": "restaurant",
        "site": "https://petitzinc.fr",
        "emails": ["contact@petitzinc.fr", "resa@petitzinc.fr"],
        "telephones": ["+33 1 42 00 00 00"],
        "whatsapp": [],
        "etoiles": 4,
        "cuisine": "french",
        "horaires": "Mo-Su 12:00-23:00",
        "operateur": null,
        "marque": "Zinc",
        "adresse": {
            "housenumber": "11",
            "street": "Rue Saint-Benoît",
            "postcode": "75006",
            "city": "Paris",
            "country": "FR"
        },
        "lat": 48.8546,
        "lon": 2.3331,
        "osm": "https://www.openstreetmap.org/node/123",
        "source": "overpass",
        "tags": {"amenity": "restaurant", "payment:cards": "yes"},
        "sales": {"distance_km": 1.2, "contact_methods_count": 9, "emails_count": 2}
    })
}

// -----------------------------------------------------------------------
// totality
// -----------------------------------------------------------------------

#[test]
fn empty_object_normalizes_to_empty_prospect() {
    let p = normalize(json!({}));
    assert_eq!(p.name, "");
    assert_eq!(p.display_name(), "-");
    assert_eq!(p.address.full, "-");
    assert!(p.contacts.emails.is_empty());
    assert!(p.contacts.phones.is_empty());
    assert!(p.position.is_none());
    assert!(p.distance_km.is_none());
    assert_eq!(p.contact_method_count, 0);
    assert!(p.extras.is_empty());
    assert!(p.id.starts_with("syn-"));
}

#[test]
fn cafe_with_single_phone_counts_one_method() {
    let p = normalize(json!({"nom": "Café X", "telephones": ["+33..."]}));
    assert_eq!(p.name, "Café X");
    assert_eq!(p.contacts.phones, vec!["+33...".to_owned()]);
    assert!(p.contacts.emails.is_empty());
    assert_eq!(p.contact_method_count, 1);
}

#[test]
fn non_object_records_are_kept_under_value() {
    let p = normalize(json!("just a string"));
    assert_eq!(p.extras.get("value").map(String::as_str), Some("just a string"));

    let p = normalize(json!([1, 2]));
    assert_eq!(p.extras.get("value").map(String::as_str), Some("[1,2]"));

    let p = normalize(Value::Null);
    assert!(p.extras.is_empty());
}

#[test]
fn normalize_all_preserves_order() {
    let list = normalize_all(vec![json!({"nom": "B"}), json!(42), json!({"nom": "A"})]);
    let names: Vec<&str> = list.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["B", "", "A"]);
}

// -----------------------------------------------------------------------
// field mapping
// -----------------------------------------------------------------------

#[test]
fn full_record_maps_every_known_field() {
    let p = normalize(full_record());
    assert_eq!(p.name, "Le Petit Zinc");
    assert_eq!(p.address.full, "11, Rue Saint-Benoît, 75006, Paris");
    assert_eq!(p.address.city.as_deref(), Some("Paris"));
    assert_eq!(p.category.kind.as_deref(), Some("amenity"));
    assert_eq!(p.category.value.as_deref(), Some("restaurant"));
    assert_eq!(p.contacts.emails.len(), 2);
    assert_eq!(p.contacts.website.as_deref(), Some("https://petitzinc.fr"));
    assert_eq!(p.attributes.stars.as_deref(), Some("4"));
    assert_eq!(p.attributes.brand.as_deref(), Some("Zinc"));
    assert!(p.attributes.operator.is_none());
    let pos = p.position.unwrap();
    assert!((pos.lat - 48.8546).abs() < 1e-9);
    assert!((p.distance_km.unwrap() - 1.2).abs() < 1e-9);
    assert_eq!(p.source_ref.as_deref(), Some("https://www.openstreetmap.org/node/123"));
    assert_eq!(p.id, "https://www.openstreetmap.org/node/123");
    assert_eq!(p.contact_method_count, 3);
    assert_eq!(p.payment_methods.get("cards").map(String::as_str), Some("yes"));
}

#[test]
fn contact_count_is_computed_not_trusted() {
    let p = normalize(json!({"contact_methods_count": 4, "emails": []}));
    assert_eq!(p.contact_method_count, 0);
    assert_eq!(p.extras.get("contact_methods_count").map(String::as_str), Some("4"));
}

#[test]
fn unmapped_keys_are_preserved_in_extras() {
    let p = normalize(full_record());
    assert_eq!(p.extras.get("source").map(String::as_str), Some("overpass"));
    assert_eq!(p.extras.get("adresse.country").map(String::as_str), Some("FR"));
    assert_eq!(p.extras.get("sales.contact_methods_count").map(String::as_str), Some("9"));
    assert_eq!(p.extras.get("sales.emails_count").map(String::as_str), Some("2"));
    assert!(!p.extras.contains_key("sales.distance_km"));
}

#[test]
fn every_input_key_is_mapped_or_preserved() {
    let raw = json!({
        "nom": "X",
        "mystery": {"a": 1},
        "flag": true,
        "rating_count": 17,
        "lat": "not a number",
        "lon": 2.0,
        "emails": {"primary": "a@b.c"},
        "site": ["https://a", "https://b"]
    });
    let p = normalize(raw);
    for key in ["mystery", "flag", "rating_count", "lat", "lon", "emails", "site"] {
        assert!(p.extras.contains_key(key), "{key} should be preserved");
    }
    assert!(p.position.is_none());
    assert!(p.contacts.emails.is_empty());
    assert!(p.contacts.website.is_none());
    assert_eq!(p.extras.get("mystery").map(String::as_str), Some(r#"{"a":1}"#));
}

#[test]
fn light_view_flat_address_is_used() {
    let p = normalize(json!({
        "nom": "Boulangerie",
        "city": "Lyon",
        "street": "Rue Mercière",
        "postcode": 69002,
        "distance_km": 0.4
    }));
    assert_eq!(p.address.full, "Rue Mercière, 69002, Lyon");
    assert_eq!(p.address.postcode.as_deref(), Some("69002"));
    assert!((p.distance_km.unwrap() - 0.4).abs() < 1e-9);
    assert!(p.extras.is_empty());
}

#[test]
fn conflicting_flat_address_part_goes_to_extras() {
    let p = normalize(json!({
        "adresse": {"city": "Paris"},
        "city": "Lyon"
    }));
    assert_eq!(p.address.city.as_deref(), Some("Paris"));
    assert_eq!(p.extras.get("city").map(String::as_str), Some("Lyon"));
}

#[test]
fn string_address_becomes_full_address() {
    let p = normalize(json!({"adresse": "  1 Place Bellecour, Lyon "}));
    assert_eq!(p.address.full, "1 Place Bellecour, Lyon");
    assert!(p.address.city.is_none());
}

#[test]
fn english_aliases_are_accepted() {
    let p = normalize(json!({
        "name": "Shop",
        "activity_type": "shop",
        "category": "bakery",
        "latitude": 45.0,
        "longitude": 4.8,
        "email": "a@shop.fr; b@shop.fr",
        "phone": "0400000000",
        "website": "https://shop.fr",
        "opening_hours": "24/7",
        "brand": "Paul",
        "operator": "Holder"
    }));
    assert_eq!(p.name, "Shop");
    assert_eq!(p.category.label(), Some("bakery"));
    assert!(p.position.is_some());
    assert_eq!(p.contacts.emails, vec!["a@shop.fr", "b@shop.fr"]);
    assert_eq!(p.contacts.phones, vec!["0400000000"]);
    assert_eq!(p.attributes.hours.as_deref(), Some("24/7"));
    assert_eq!(p.attributes.operator.as_deref(), Some("Holder"));
    assert_eq!(p.contact_method_count, 3);
}

#[test]
fn list_aliases_merge_and_deduplicate() {
    let p = normalize(json!({
        "telephones": ["+33 1", "+33 2"],
        "phone": "+33 2, +33 3"
    }));
    assert_eq!(p.contacts.phones, vec!["+33 1", "+33 2", "+33 3"]);
}

#[test]
fn duplicate_text_alias_is_preserved() {
    let p = normalize(json!({"nom": "Nom FR", "name": "English name"}));
    assert_eq!(p.name, "Nom FR");
    assert_eq!(p.extras.get("name").map(String::as_str), Some("English name"));
}

#[test]
fn out_of_range_coordinates_are_not_a_position() {
    let p = normalize(json!({"lat": 123.0, "lon": 2.0}));
    assert!(p.position.is_none());
    assert_eq!(p.extras.get("lat").map(String::as_str), Some("123.0"));
    assert_eq!(p.extras.get("lon").map(String::as_str), Some("2.0"));
}

#[test]
fn numeric_id_is_stringified() {
    let p = normalize(json!({"id": 987, "osm": "https://osm.org/node/1"}));
    assert_eq!(p.id, "987");
}

#[test]
fn synthesized_id_is_stable_and_name_sensitive() {
    let a = normalize(json!({"nom": "Café", "lat": 1.0, "lon": 2.0}));
    let b = normalize(json!({"nom": "  CAFÉ ", "lat": 1.0, "lon": 2.0}));
    let c = normalize(json!({"nom": "Bar", "lat": 1.0, "lon": 2.0}));
    assert_eq!(a.id, b.id);
    assert_ne!(a.id, c.id);
    assert_eq!(a.id.len(), "syn-".len() + 16);
}

#[test]
fn tags_pass_through_and_feed_payment_methods() {
    let p = normalize(json!({
        "tags": {"amenity": "cafe", "payment:cash": "yes", "capacity": 30},
        "payment": {"cash": "no"}
    }));
    assert_eq!(p.tags_raw.get("capacity").map(String::as_str), Some("30"));
    assert_eq!(p.payment_methods.get("cash").map(String::as_str), Some("no"));
}

#[test]
fn backend_osm_record_shape_is_mapped() {
    let p = normalize(json!({
        "entity_key": "osm:node:42",
        "nom": "Café des Arts",
        "activite_type": "amenity",
        "activite_valeur": "cafe",
        "emails": [],
        "telephones": ["+33 4 00 00 00 00"],
        "adresse": {"housenumber": "3", "street": "Place Bellecour", "city": "Lyon", "country": "FR"},
        "lat": 45.7578,
        "lon": 4.832,
        "osm": "https://www.openstreetmap.org/node/42",
        "source": "OpenStreetMap",
        "raw_tags": {"amenity": "cafe", "payment:cash": "yes", "outdoor_seating": "yes"}
    }));
    assert_eq!(p.id, "osm:node:42");
    assert_eq!(p.tags_raw.get("amenity").map(String::as_str), Some("cafe"));
    assert_eq!(p.tags_raw.get("outdoor_seating").map(String::as_str), Some("yes"));
    assert_eq!(p.payment_methods.get("cash").map(String::as_str), Some("yes"));
    assert!(!p.extras.contains_key("raw_tags"));
    assert!(!p.extras.contains_key("entity_key"));
    assert_eq!(p.extras.get("adresse.country").map(String::as_str), Some("FR"));
    assert_eq!(p.extras.get("source").map(String::as_str), Some("OpenStreetMap"));
}

#[test]
fn non_object_sales_is_preserved() {
    let p = normalize(json!({"sales": "n/a"}));
    assert_eq!(p.extras.get("sales").map(String::as_str), Some("n/a"));
    assert!(p.distance_km.is_none());
}
