//! Parameterised selector rendering and canonicalization tests.

use async_trait::async_trait;
use rstest::rstest;
use tokio_util::sync::CancellationToken;

use imagepin_core::{
    BoxError, Builder, CanonicalReference, ResolveError, ResolvedDigest, Selector,
};
use imagepin_resolve::rewriter::render;
use imagepin_resolve::scanner::parse_reference;

struct AcceptAll;

#[async_trait]
impl Builder for AcceptAll {
    type Artifact = ();

    fn is_supported_reference(&self, _: &CanonicalReference) -> Result<(), BoxError> {
        Ok(())
    }

    async fn build(
        &self,
        _: &CancellationToken,
        _: &CanonicalReference,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[rstest]
#[case(Selector::All, "registry.example/repo@sha256:abcd")]
#[case(Selector::Raw, "registry.example/repo@sha256:abcd")]
#[case(Selector::Registry, "registry.example")]
#[case(Selector::Repository, "registry.example/repo")]
#[case(Selector::Name, "repo")]
#[case(Selector::Tag, "latest@sha256:abcd")]
#[case(Selector::TagWithSeparator, "@sha256:abcd")]
fn digest_form(#[case] selector: Selector, #[case] expected: &str) {
    let digest = ResolvedDigest::from("registry.example/repo@sha256:abcd");
    assert_eq!(render(&selector, &digest), expected);
}

#[rstest]
#[case(Selector::All, "registry.example/repo:v1")]
#[case(Selector::Registry, "registry.example")]
#[case(Selector::Repository, "registry.example/repo")]
#[case(Selector::Name, "repo")]
#[case(Selector::Tag, "v1")]
#[case(Selector::TagWithSeparator, ":v1")]
fn tagged_form(#[case] selector: Selector, #[case] expected: &str) {
    let digest = ResolvedDigest::from("registry.example/repo:v1");
    assert_eq!(render(&selector, &digest), expected);
}

#[rstest]
#[case(Selector::Registry, "localhost:5000/team")]
#[case(Selector::Repository, "localhost:5000/team/app")]
#[case(Selector::Name, "app")]
#[case(Selector::Tag, "latest@sha256:0123")]
#[case(Selector::TagWithSeparator, "@sha256:0123")]
fn registry_port_and_nested_path(#[case] selector: Selector, #[case] expected: &str) {
    let digest = ResolvedDigest::from("localhost:5000/team/app@sha256:0123");
    assert_eq!(render(&selector, &digest), expected);
}

#[rstest]
#[case("registry.example/repo@sha256:abcd")]
#[case("registry.example/repo:v1")]
#[case("anything at all")]
fn defined_registry_ignores_digest(#[case] digest: &str) {
    let selector = Selector::DefinedRegistry("myregistry.io".into());
    assert_eq!(render(&selector, &ResolvedDigest::from(digest)), "myregistry.io");
}

// ---------------------------------------------------------------------------
// Canonicalization
// ---------------------------------------------------------------------------

#[rstest]
#[case("ko://github.com/acme/app/cmd/server")]
#[case("ko://github.com/acme/app/cmd/server?part=tag")]
#[case("ko://github.com/acme/app/cmd/server?part=name&debug=1")]
#[case("ko://github.com/acme/app/cmd/server?part=definedRegistry=reg.io#frag")]
#[case("ko://github.com/acme/app/cmd/server?")]
fn query_never_changes_canonical_reference(#[case] raw: &str) {
    let (reference, _) = parse_reference(raw, &AcceptAll).expect("parse");
    assert_eq!(reference.as_str(), "ko://github.com/acme/app/cmd/server");
}

#[rstest]
#[case("ko://github.com/acme/./app/../x", "ko://github.com/acme/./app/../x")]
#[case("ko://github.com/acme/./app/../x?part=tag", "ko://github.com/acme/./app/../x")]
#[case("ko://github.com/a b", "ko://github.com/a b")]
#[case("ko://github.com/acme/app%2Fcmd", "ko://github.com/acme/app%2Fcmd")]
#[case("ko://bot:secret@github.com/acme/app#main", "ko://github.com/acme/app")]
fn canonical_reference_keeps_path_as_written(#[case] raw: &str, #[case] expected: &str) {
    let (reference, _) = parse_reference(raw, &AcceptAll).expect("parse");
    assert_eq!(reference.as_str(), expected);
}

#[rstest]
#[case("ko://github.com/app%zz")]
#[case("ko://github.com/acme/app%2")]
#[case("ko://github.com/acme/%/app?part=tag")]
fn invalid_path_escape_is_a_parse_error(#[case] raw: &str) {
    let err = parse_reference(raw, &AcceptAll).unwrap_err();
    assert!(matches!(err, ResolveError::ReferenceParse { .. }), "got: {err}");
    assert!(err.to_string().contains("invalid URL escape"), "got: {err}");
}

#[test]
fn canonicalization_is_idempotent() {
    let (once, _) =
        parse_reference("ko://github.com/acme/app?part=tag", &AcceptAll).expect("parse");
    let (twice, selector) = parse_reference(once.as_str(), &AcceptAll).expect("parse");
    assert_eq!(once, twice);
    assert_eq!(selector, Selector::All);
}
