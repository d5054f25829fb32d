#[test]
fn macro_pass() {
    let t = trybuild::TestCases::new();
    t.pass("tests/macro/*.rs");
}
