#![forbid(unsafe_code)]

use std::fmt;

use crate::symbols::{enclosing_chain, member_of_enclosing, NestingKind, SymbolTable};
use crate::Candidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EligibilityVerdict {
    Eligible,
    Ineligible(IneligibleReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IneligibleReason {
    /// The class has no outer-instance slot to remove (top-level, or already
    /// static).
    NoOuterSlot,
    /// Local and anonymous classes cannot be written as static members.
    NotAMemberType,
    /// The owner is itself an inner class, so removing the direct outer link
    /// would still leave an instance chain through the owner.
    OwnerRequiresOuter,
    /// The declared supertype is a member of the enclosing chain; implicit
    /// super-constructor delegation could thread an outer instance.
    SupertypeIsEnclosingMember,
    /// The declared supertype did not resolve; conversion cannot be proven
    /// safe.
    UnresolvedSupertype,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            IneligibleReason::NoOuterSlot => "no outer instance to remove",
            IneligibleReason::NotAMemberType => "local and anonymous classes cannot be static",
            IneligibleReason::OwnerRequiresOuter => "enclosing class is itself an inner class",
            IneligibleReason::SupertypeIsEnclosingMember => {
                "supertype is a member of the enclosing class"
            }
            IneligibleReason::UnresolvedSupertype => "supertype could not be resolved",
        };
        f.write_str(msg)
    }
}

/// Structural pre-checks that reject a candidate without touching its body.
pub fn check_eligible<T: SymbolTable + ?Sized>(
    table: &T,
    candidate: &Candidate<'_>,
) -> EligibilityVerdict {
    use EligibilityVerdict::*;
    use IneligibleReason::*;

    if !table.has_outer_instance(candidate.symbol) {
        return Ineligible(NoOuterSlot);
    }

    match table.nesting_kind(candidate.symbol) {
        NestingKind::Local | NestingKind::Anonymous => return Ineligible(NotAMemberType),
        NestingKind::Member => {}
        // A top-level class has no outer slot and is caught above; seeing it
        // here means the table is inconsistent, so reject.
        NestingKind::TopLevel => return Ineligible(NoOuterSlot),
    }

    let Some(owner) = table.owner(candidate.symbol) else {
        // A member class without an owner is malformed; do not convert.
        return Ineligible(OwnerRequiresOuter);
    };
    if table.has_outer_instance(owner) {
        return Ineligible(OwnerRequiresOuter);
    }

    if let Some(sup_ref) = &candidate.decl.extends {
        let sup = sup_ref
            .named()
            .and_then(|named| table.symbol_at(named.id));
        let Some(sup) = sup else {
            return Ineligible(UnresolvedSupertype);
        };
        let chain = enclosing_chain(table, candidate.symbol);
        if member_of_enclosing(table, sup, &chain) {
            return Ineligible(SupertypeIsEnclosingMember);
        }
    }

    Eligible
}
