//! Parameterised selector parsing tests.

use imagepin_core::{ResolveError, Selector};
use rstest::rstest;

#[rstest]
#[case("all", Selector::All)]
#[case("registry", Selector::Registry)]
#[case("repository", Selector::Repository)]
#[case("name", Selector::Name)]
#[case("tag", Selector::Tag)]
#[case("tagWithSeparator", Selector::TagWithSeparator)]
#[case("definedRegistry=myregistry.io", Selector::DefinedRegistry("myregistry.io".into()))]
#[case("definedRegistry=a=b", Selector::DefinedRegistry("a=b".into()))]
#[case("definedRegistry=", Selector::DefinedRegistry(String::new()))]
fn known_parts(#[case] part: &str, #[case] expected: Selector) {
    assert_eq!(Selector::from_part(part).expect("parse"), expected);
}

#[rstest]
#[case("")]
#[case("digest")]
#[case("Tag")]
#[case("definedRegistryX=foo")]
#[case("definedRegistries")]
fn unknown_parts_fall_back_to_raw(#[case] part: &str) {
    assert_eq!(Selector::from_part(part).expect("parse"), Selector::Raw);
}

#[test]
fn defined_registry_without_value_is_invalid() {
    let err = Selector::from_part("definedRegistry").unwrap_err();
    assert!(matches!(err, ResolveError::InvalidSelector { .. }), "got: {err}");
    assert!(err.to_string().contains("invalid definedRegistry part"));
}

#[test]
fn default_selector_is_all() {
    assert_eq!(Selector::default(), Selector::All);
}
