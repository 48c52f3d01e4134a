//! Integration tests for the image reference grammar

use cab::core::image_name::ImageName;

#[test]
fn test_round_trip_through_canonical_form() {
    for text in [
        "localhost/cab-builds/demo:latest",
        "localhost/cab-builds/demo:20260807T120000Z-raw",
        "localhost/cab/base/acme:v1",
        "registry.example.com/cab/builder/acme:v1",
    ] {
        let parsed = ImageName::parse(text).expect("must parse");
        assert_eq!(parsed.to_string(), text);
    }
}

#[test]
fn test_mismatches_are_no_match_not_errors() {
    for text in [
        "",
        "alpine",
        "alpine:3.19",
        "docker.io/library/alpine",
        "<none>:<none>",
        "localhost/name only",
    ] {
        assert!(ImageName::parse(text).is_none(), "{text:?} must not parse");
    }
}

#[test]
fn test_components_are_separated_correctly() {
    let name = ImageName::parse("localhost/cab/base/acme:v1").unwrap();
    assert_eq!(name.remote, "localhost");
    assert_eq!(name.repository, "cab/base");
    assert_eq!(name.name, "acme");
    assert_eq!(name.tag, "v1");
}

#[test]
fn test_base_and_build_images_disambiguate_by_repository() {
    // A vendor/release pair and a build can collide on name/tag.
    let base = ImageName::parse("localhost/cab/base/acme:v1").unwrap();
    let builder = ImageName::parse("localhost/cab/builder/acme:v1").unwrap();
    assert!(base.matches("acme", "v1"));
    assert!(builder.matches("acme", "v1"));
    assert!(base.matches_in("cab/base", "acme", "v1"));
    assert!(!builder.matches_in("cab/base", "acme", "v1"));
}
