use nestor_parse::parse_source;
use nestor_sema::{Analysis, OuterRefReason, ReferenceVerdict, Sema};

fn analyze(src: &str, path: &str) -> Analysis {
    let program = parse_source(src).expect("parse");
    let sema = Sema::new(&program);
    let decl = sema.class_named(path).expect("class lookup");
    sema.analyze_class(decl)
}

fn outer_reference(src: &str, path: &str) -> OuterRefReason {
    match analyze(src, path) {
        Analysis::Analyzed(ReferenceVerdict::OuterReference(reason)) => reason,
        other => panic!("expected an outer reference, got {other:?}"),
    }
}

fn convertible(src: &str, path: &str) -> bool {
    analyze(src, path).convertible()
}

#[test]
fn reading_an_enclosing_instance_field_is_an_outer_reference() {
    let src = r#"
class Outer {
    int count;
    class Inner {
        int read() {
            return count;
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::InstanceMemberAccess
    );
}

#[test]
fn writing_an_enclosing_instance_field_is_an_outer_reference() {
    let src = r#"
class Outer {
    int count;
    class Inner {
        void bump() {
            count = count + 1;
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::InstanceMemberAccess
    );
}

#[test]
fn calling_an_enclosing_instance_method_is_an_outer_reference() {
    let src = r#"
class Outer {
    void ping() {
    }
    class Inner {
        void m() {
            ping();
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::InstanceMemberAccess
    );
}

#[test]
fn calling_a_static_method_of_the_enclosing_class_is_safe() {
    let src = r#"
class Outer {
    static int limit() {
        return 100;
    }
    class Inner {
        int m() {
            return limit();
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn reading_a_constant_of_the_enclosing_class_is_safe() {
    let src = r#"
class Outer {
    static final int LIMIT = 100;
    class Inner {
        int m() {
            return LIMIT;
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn using_the_enclosing_class_as_a_static_qualifier_is_safe() {
    let src = r#"
class Outer {
    static final int LIMIT = 100;
    static int limit() {
        return Outer.LIMIT;
    }
    class Inner {
        int m() {
            return Outer.limit();
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn own_members_are_not_outer_references() {
    let src = r#"
class Outer {
    class Inner {
        int x;
        int twice() {
            return x + x;
        }
        void set(int v) {
            this.x = v;
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn own_member_shadowing_an_enclosing_field_is_safe() {
    let src = r#"
class Outer {
    int x;
    class Inner {
        int x;
        int read() {
            return x;
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn inherited_member_of_the_enclosing_class_counts() {
    // `total` is declared on Base but reaches Inner through Outer, so the
    // unqualified read still needs the enclosing instance.
    let src = r#"
class Base {
    int total;
}
class Outer extends Base {
    class Inner {
        int read() {
            return total;
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::InstanceMemberAccess
    );
}

#[test]
fn members_inherited_by_the_candidate_itself_are_safe() {
    let src = r#"
class Base {
    int total;
}
class Outer {
    class Inner extends Base {
        int read() {
            return total;
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn qualified_this_is_an_outer_reference() {
    let src = r#"
class Outer {
    int x;
    class Inner {
        int read() {
            return Outer.this.x;
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::QualifiedThis
    );
}

#[test]
fn qualified_this_naming_the_candidate_is_safe() {
    let src = r#"
class Outer {
    class Inner {
        int x;
        int read() {
            return Inner.this.x;
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn constructing_an_inner_class_of_the_enclosing_class_is_an_outer_reference() {
    let src = r#"
class Outer {
    class Other {
    }
    class Inner {
        void m() {
            var o = new Other();
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::ConstructorRequiresOuter
    );
}

#[test]
fn constructing_the_candidates_own_inner_class_is_safe() {
    let src = r#"
class Outer {
    class Inner {
        class Sub {
        }
        void m() {
            var s = new Sub();
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn constructing_a_static_nested_class_is_safe() {
    let src = r#"
class Outer {
    static class Holder {
    }
    class Inner {
        void m() {
            var h = new Holder();
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn constructing_a_local_class_that_extends_an_inner_class_is_an_outer_reference() {
    // Helper itself is owned by the candidate, but its implicit super
    // delegation needs an Outer instance to contain the Base part.
    let src = r#"
class Outer {
    class Base {
    }
    class Inner {
        void m() {
            class Helper extends Base {
            }
            var h = new Helper();
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::ConstructorRequiresOuter
    );
}

#[test]
fn constructing_an_own_member_class_that_extends_an_inner_class_is_an_outer_reference() {
    let src = r#"
class Outer {
    class Base {
    }
    class Inner {
        class Helper extends Base {
        }
        void m() {
            var h = new Helper();
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::ConstructorRequiresOuter
    );
}

#[test]
fn declaring_a_local_class_that_extends_an_inner_class_is_an_outer_reference() {
    // Never instantiated here, but the declaration alone owes a super
    // delegation that needs the enclosing instance.
    let src = r#"
class Outer {
    class Base {
    }
    class Inner {
        void m() {
            class Helper extends Base {
            }
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::ConstructorRequiresOuter
    );
}

#[test]
fn explicit_super_to_an_inner_class_inside_a_local_class_is_an_outer_reference() {
    let src = r#"
class Outer {
    class Base {
    }
    class Inner {
        void m() {
            class Helper extends Base {
                Helper() {
                    super();
                }
            }
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::ConstructorRequiresOuter
    );
}

#[test]
fn local_class_extending_a_top_level_base_is_safe() {
    let src = r#"
class Base {
}
class Outer {
    class Inner {
        void m() {
            class Helper extends Base {
            }
            var h = new Helper();
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn super_delegation_to_a_top_level_base_is_safe() {
    let src = r#"
class Base {
}
class Outer {
    class Inner extends Base {
        Inner() {
            super();
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn anonymous_class_capture_is_attributed_to_the_candidate() {
    // The anonymous class shares the candidate's outer-instance slot, so its
    // qualified-this capture makes the candidate unconvertible.
    let src = r#"
class Runnable {
}
class Outer {
    int x;
    class Inner {
        void m() {
            var r = new Runnable() {
                int grab() {
                    return Outer.this.x;
                }
            };
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::QualifiedThis
    );
}

#[test]
fn local_class_reference_is_attributed_to_the_candidate() {
    let src = r#"
class Outer {
    int x;
    class Inner {
        void m() {
            class Helper {
                void help() {
                    x = 1;
                }
            }
            var h = new Helper();
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::InstanceMemberAccess
    );
}

#[test]
fn nested_member_class_bodies_are_not_attributed() {
    // Deeper's reference binds Deeper's own outer instance, not Inner's;
    // Inner itself stays convertible.
    let src = r#"
class Outer {
    class Inner {
        int y;
        class Deeper {
            int read() {
                return y;
            }
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn unresolved_name_is_conservatively_an_outer_reference() {
    let src = r#"
class Outer {
    class Inner {
        void m() {
            frobnicate();
        }
    }
}
"#;
    assert_eq!(
        outer_reference(src, "Outer.Inner"),
        OuterRefReason::UnresolvedSymbol
    );
}

#[test]
fn locals_and_parameters_are_safe() {
    let src = r#"
class Outer {
    class Inner {
        int sum(int a, int b) {
            int c = a + b;
            return c;
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn captured_method_locals_are_safe_inside_local_classes() {
    let src = r#"
class Outer {
    class Inner {
        int m(int seed) {
            class Helper {
                int grab() {
                    return seed;
                }
            }
            var h = new Helper();
            return h.grab();
        }
    }
}
"#;
    assert!(convertible(src, "Outer.Inner"));
}

#[test]
fn analysis_is_idempotent() {
    let src = r#"
class Outer {
    int count;
    class Inner {
        int read() {
            return count;
        }
    }
}
"#;
    let program = parse_source(src).expect("parse");
    let sema = Sema::new(&program);
    let decl = sema.class_named("Outer.Inner").expect("class lookup");
    assert_eq!(sema.analyze_class(decl), sema.analyze_class(decl));
}

#[test]
fn analyze_all_reports_every_nested_class() {
    let src = r#"
class Outer {
    int count;
    class Reads {
        int read() {
            return count;
        }
    }
    class Clean {
    }
    static class Holder {
    }
}
"#;
    let program = parse_source(src).expect("parse");
    let sema = Sema::new(&program);
    let mut results = sema.analyze_all();
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let convertible: Vec<&str> = results
        .iter()
        .filter(|(_, a)| a.convertible())
        .map(|(p, _)| p.as_str())
        .collect();
    assert_eq!(convertible, vec!["Outer.Clean"]);
    assert_eq!(results.len(), 3);
}
