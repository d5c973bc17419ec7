use nestor_parse::parse_source;
use nestor_sema::{Analysis, IneligibleReason, ReferenceVerdict, Sema};

fn analyze(src: &str, path: &str) -> Analysis {
    let program = parse_source(src).expect("parse");
    let sema = Sema::new(&program);
    let decl = sema.class_named(path).expect("class lookup");
    sema.analyze_class(decl)
}

#[test]
fn empty_member_class_is_eligible_and_convertible() {
    let src = r#"
class Outer {
    class Inner {
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Inner"),
        Analysis::Analyzed(ReferenceVerdict::NoOuterReference)
    );
}

#[test]
fn already_static_class_has_no_outer_slot() {
    let src = r#"
class Outer {
    static class Holder {
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Holder"),
        Analysis::Ineligible(IneligibleReason::NoOuterSlot)
    );
}

#[test]
fn top_level_class_has_no_outer_slot() {
    let src = "class Solo { }";
    assert_eq!(
        analyze(src, "Solo"),
        Analysis::Ineligible(IneligibleReason::NoOuterSlot)
    );
}

#[test]
fn class_inside_inner_class_is_rejected_structurally() {
    // The middle class is non-static, so the innermost class cannot be
    // static regardless of what its body does.
    let src = r#"
class Outer {
    class Middle {
        class Innermost {
        }
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Middle.Innermost"),
        Analysis::Ineligible(IneligibleReason::OwnerRequiresOuter)
    );
}

#[test]
fn class_inside_static_class_is_not_rejected_by_owner_check() {
    let src = r#"
class Outer {
    static class Holder {
        class Inner {
        }
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Holder.Inner"),
        Analysis::Analyzed(ReferenceVerdict::NoOuterReference)
    );
}

#[test]
fn extending_a_member_of_the_enclosing_class_is_rejected() {
    let src = r#"
class Outer {
    class Base {
    }
    class Derived extends Base {
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Derived"),
        Analysis::Ineligible(IneligibleReason::SupertypeIsEnclosingMember)
    );
}

#[test]
fn extending_a_member_of_a_grandparent_is_rejected() {
    let src = r#"
class Outer {
    class Base {
    }
    static class Holder {
        class Derived extends Base {
        }
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Holder.Derived"),
        Analysis::Ineligible(IneligibleReason::SupertypeIsEnclosingMember)
    );
}

#[test]
fn extending_a_top_level_class_is_fine() {
    let src = r#"
class Base {
}
class Outer {
    class Derived extends Base {
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Derived"),
        Analysis::Analyzed(ReferenceVerdict::NoOuterReference)
    );
}

#[test]
fn extending_the_enclosing_class_itself_is_fine() {
    // The enclosing class is not a *member* of the chain, so the gate lets
    // this through, and delegation to its constructor needs no outer
    // instance.
    let src = r#"
class Outer {
    class Derived extends Outer {
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Derived"),
        Analysis::Analyzed(ReferenceVerdict::NoOuterReference)
    );
}

#[test]
fn unresolved_supertype_is_rejected_conservatively() {
    let src = r#"
class Outer {
    class Derived extends Missing {
    }
}
"#;
    assert_eq!(
        analyze(src, "Outer.Derived"),
        Analysis::Ineligible(IneligibleReason::UnresolvedSupertype)
    );
}

#[test]
fn local_class_is_never_eligible() {
    let src = r#"
class Outer {
    void m() {
        class Helper {
        }
        var h = new Helper();
    }
}
"#;
    let program = parse_source(src).expect("parse");
    let sema = Sema::new(&program);
    let (_, decl) = sema
        .nested_classes()
        .into_iter()
        .find(|(path, _)| path == "Outer.Helper")
        .expect("local class is enumerated");
    assert_eq!(
        sema.analyze_class(decl),
        Analysis::Ineligible(IneligibleReason::NotAMemberType)
    );
}

#[test]
fn unknown_class_lookup_reports_error() {
    let program = parse_source("class A { }").expect("parse");
    let sema = Sema::new(&program);
    let err = sema.class_named("A.Nope").expect_err("lookup should fail");
    assert!(err.message.contains("A.Nope"), "unexpected error: {err}");
}
