//! Generic-parameter constraint model.
//!
//! A [`ConstraintSet`] maps each generic parameter position of a template or
//! implementation to the [`ParamConstraints`] it demands. Two predicates are
//! defined over it:
//!
//! - [`satisfies`]: does a concrete type meet every requirement of a parameter?
//! - [`subsumes`]: does an implementation demand at least what its interface
//!   demands?
//!
//! Requirements are evaluated as an unordered conjunction. When a violation is
//! reported, the first one in the canonical [`Requirement`] order is named, so
//! diagnostics are stable regardless of how requirements were declared.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashSet;

use crate::{
    ConcreteType, ConstraintError, Fingerprint, Fingerprinted, Operator, OperatorForm,
    TypeCategory, TypeTraits,
};

bitflags! {
    /// Category and structural requirements on a generic parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct ConstraintFlags: u8 {
        /// Must be a value type.
        const VALUE_TYPE = 1 << 0;
        /// Must be a reference type.
        const REFERENCE_TYPE = 1 << 1;
        /// Must be unmanaged. Implies VALUE_TYPE.
        const UNMANAGED = 1 << 2;
        /// Must be an enumeration. Implies UNMANAGED and VALUE_TYPE.
        const ENUM = 1 << 3;
        /// Must be readonly. Implies VALUE_TYPE.
        const READONLY = 1 << 4;
        /// Must declare no instance fields.
        const NO_INSTANCE_FIELDS = 1 << 5;
    }
}

impl ConstraintFlags {
    /// Add every flag implied by the ones present.
    pub fn normalized(self) -> Self {
        let mut flags = self;
        if flags.contains(Self::ENUM) {
            flags |= Self::UNMANAGED;
        }
        if flags.intersects(Self::UNMANAGED | Self::READONLY) {
            flags |= Self::VALUE_TYPE;
        }
        flags
    }

    /// A value requirement and a reference requirement cannot both hold.
    pub fn is_conflicting(self) -> bool {
        self.normalized()
            .contains(Self::VALUE_TYPE | Self::REFERENCE_TYPE)
    }
}

/// A single requirement, as named in diagnostics.
///
/// The derived ordering is the canonical evaluation-report order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Requirement {
    ValueType,
    ReferenceType,
    Unmanaged,
    Enum,
    Readonly,
    NoInstanceFields,
    Operator { op: Operator, form: OperatorForm },
    MustOverride(String),
}

impl Requirement {
    /// Expand normalized flags into individual requirements.
    fn from_flags(flags: ConstraintFlags) -> impl Iterator<Item = Requirement> {
        const TABLE: [(ConstraintFlags, Requirement); 6] = [
            (ConstraintFlags::VALUE_TYPE, Requirement::ValueType),
            (ConstraintFlags::REFERENCE_TYPE, Requirement::ReferenceType),
            (ConstraintFlags::UNMANAGED, Requirement::Unmanaged),
            (ConstraintFlags::ENUM, Requirement::Enum),
            (ConstraintFlags::READONLY, Requirement::Readonly),
            (ConstraintFlags::NO_INSTANCE_FIELDS, Requirement::NoInstanceFields),
        ];
        let flags = flags.normalized();
        TABLE
            .into_iter()
            .filter(move |(flag, _)| flags.contains(*flag))
            .map(|(_, req)| req)
    }

    /// Check this single requirement against a concrete type.
    pub fn is_met_by(&self, ty: &ConcreteType) -> bool {
        match self {
            Requirement::ValueType => ty.category == TypeCategory::Value,
            Requirement::ReferenceType => ty.category == TypeCategory::Reference,
            Requirement::Unmanaged => {
                ty.category == TypeCategory::Value && ty.traits.contains(TypeTraits::UNMANAGED)
            }
            Requirement::Enum => ty.traits.contains(TypeTraits::ENUM),
            Requirement::Readonly => ty.traits.contains(TypeTraits::READONLY),
            Requirement::NoInstanceFields => ty.traits.contains(TypeTraits::NO_INSTANCE_FIELDS),
            Requirement::Operator { op, form } => ty.provides(*op, *form),
            Requirement::MustOverride(member) => ty.overrides.contains(member),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::ValueType => write!(f, "must be a value type"),
            Requirement::ReferenceType => write!(f, "must be a reference type"),
            Requirement::Unmanaged => write!(f, "must be unmanaged"),
            Requirement::Enum => write!(f, "must be an enum"),
            Requirement::Readonly => write!(f, "must be readonly"),
            Requirement::NoInstanceFields => write!(f, "must declare no instance fields"),
            Requirement::Operator { op, form } => write!(f, "must provide {op} {form}"),
            Requirement::MustOverride(member) => write!(f, "must override '{member}'"),
        }
    }
}

/// Requirements on one generic parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParamConstraints {
    /// Parameter name (e.g., "T").
    pub name: String,
    /// Category and structural flags.
    pub flags: ConstraintFlags,
    /// Required operators and their functional form.
    pub operators: BTreeMap<Operator, OperatorForm>,
    /// Member names the argument must override.
    pub must_override: BTreeSet<String>,
}

impl ParamConstraints {
    /// An unconstrained parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add flags. Implied flags are added too, so equal requirements compare
    /// equal however they were spelled.
    pub fn with_flags(mut self, flags: ConstraintFlags) -> Self {
        self.flags = (self.flags | flags).normalized();
        self
    }

    /// Require an operator in its natural form.
    pub fn require_operator(self, op: Operator) -> Self {
        self.require_operator_form(op, op.natural_form())
    }

    pub fn require_operator_form(mut self, op: Operator, form: OperatorForm) -> Self {
        self.operators.insert(op, form);
        self
    }

    pub fn require_override(mut self, member: impl Into<String>) -> Self {
        self.must_override.insert(member.into());
        self
    }

    /// Every requirement, in canonical order.
    pub fn requirements(&self) -> Vec<Requirement> {
        let mut reqs: Vec<Requirement> = Requirement::from_flags(self.flags).collect();
        reqs.extend(
            self.operators
                .iter()
                .map(|(op, form)| Requirement::Operator { op: *op, form: *form }),
        );
        reqs.extend(self.must_override.iter().cloned().map(Requirement::MustOverride));
        reqs
    }

    /// Every requirement the concrete type fails. All requirements are
    /// evaluated; the result is in canonical order.
    pub fn violations(&self, ty: &ConcreteType) -> Vec<Requirement> {
        self.requirements()
            .into_iter()
            .filter(|req| !req.is_met_by(ty))
            .collect()
    }

    /// First violated requirement, if any.
    pub fn check(&self, ty: &ConcreteType) -> Result<(), Requirement> {
        match self.violations(ty).into_iter().next() {
            Some(req) => Err(req),
            None => Ok(()),
        }
    }

    pub fn satisfied_by(&self, ty: &ConcreteType) -> bool {
        self.violations(ty).is_empty()
    }

    /// First requirement of `other` that `self` does not also demand.
    pub fn first_unsubsumed(&self, other: &ParamConstraints) -> Option<Requirement> {
        let ours: FxHashSet<Requirement> = self.requirements().into_iter().collect();
        other
            .requirements()
            .into_iter()
            .find(|req| !ours.contains(req))
    }

    /// `self` demands everything `other` demands.
    pub fn subsumes(&self, other: &ParamConstraints) -> bool {
        self.first_unsubsumed(other).is_none()
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        if self.flags.is_conflicting() {
            return Err(ConstraintError::Conflicting {
                parameter: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// A violated requirement at a specific parameter position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub position: usize,
    pub parameter: String,
    pub requirement: Requirement,
}

/// Validated, immutable per-parameter constraints in position order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConstraintSet {
    params: Vec<ParamConstraints>,
}

impl ConstraintSet {
    /// Build a constraint set. Rejects conflicting value/reference
    /// requirements and duplicate parameter names.
    pub fn new(mut params: Vec<ParamConstraints>) -> Result<Self, ConstraintError> {
        for param in &mut params {
            param.flags = param.flags.normalized();
        }
        let mut seen = FxHashSet::default();
        for param in &params {
            if !seen.insert(param.name.as_str()) {
                return Err(ConstraintError::DuplicateParameter {
                    parameter: param.name.clone(),
                });
            }
            param.validate()?;
        }
        Ok(Self { params })
    }

    /// Unconstrained parameters with the given names.
    pub fn unconstrained<I, S>(names: I) -> Result<Self, ConstraintError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(ParamConstraints::new).collect())
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ParamConstraints> {
        self.params.get(position)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamConstraints> {
        self.params.iter()
    }

    /// Check every argument against its position. Positions beyond either
    /// length are ignored; callers check arity first.
    pub fn check_arguments(&self, args: &[ConcreteType]) -> Result<(), Violation> {
        for (position, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if let Err(requirement) = param.check(arg) {
                return Err(Violation {
                    position,
                    parameter: param.name.clone(),
                    requirement,
                });
            }
        }
        Ok(())
    }

    pub fn accepts(&self, args: &[ConcreteType]) -> bool {
        args.len() == self.arity() && self.check_arguments(args).is_ok()
    }

    /// First position where `self` fails to demand a requirement of `other`.
    /// Sets of different arity never subsume each other.
    pub fn first_unsubsumed(&self, other: &ConstraintSet) -> Option<Violation> {
        for (position, (ours, theirs)) in self.params.iter().zip(&other.params).enumerate() {
            if let Some(requirement) = ours.first_unsubsumed(theirs) {
                return Some(Violation {
                    position,
                    parameter: ours.name.clone(),
                    requirement,
                });
            }
        }
        None
    }

    pub fn subsumes(&self, other: &ConstraintSet) -> bool {
        self.arity() == other.arity() && self.first_unsubsumed(other).is_none()
    }
}

impl Fingerprinted for ConstraintSet {
    fn fingerprint(&self) -> Fingerprint {
        let mut builder = Fingerprint::builder(Fingerprint::CONSTRAINT).len(self.params.len());
        for param in &self.params {
            builder = builder
                .str(&param.name)
                .u64(param.flags.bits() as u64)
                .len(param.operators.len());
            for (op, form) in &param.operators {
                builder = builder
                    .u64(*op as u64)
                    .u64(form.pass as u64)
                    .u64(form.arity as u64)
                    .u64(form.returns as u64);
            }
            builder = builder.len(param.must_override.len());
            for member in &param.must_override {
                builder = builder.str(member);
            }
        }
        builder.finish()
    }
}

/// A concrete type satisfies a parameter's constraints iff it meets every
/// requirement.
pub fn satisfies(ty: &ConcreteType, constraints: &ParamConstraints) -> bool {
    constraints.satisfied_by(ty)
}

/// Implementation constraints subsume interface constraints iff every
/// requirement the interface demands is demanded by the implementation too.
pub fn subsumes(implementation: &ConstraintSet, interface: &ConstraintSet) -> bool {
    implementation.subsumes(interface)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_t() -> ParamConstraints {
        ParamConstraints::new("T").with_flags(ConstraintFlags::VALUE_TYPE)
    }

    #[test]
    fn normalization_adds_implied_flags() {
        let flags = ConstraintFlags::ENUM.normalized();
        assert!(flags.contains(ConstraintFlags::UNMANAGED | ConstraintFlags::VALUE_TYPE));
        let flags = ConstraintFlags::READONLY.normalized();
        assert!(flags.contains(ConstraintFlags::VALUE_TYPE));
        assert!(!flags.contains(ConstraintFlags::UNMANAGED));
    }

    #[test]
    fn conflicting_category_is_rejected() {
        let bad = ParamConstraints::new("T")
            .with_flags(ConstraintFlags::VALUE_TYPE | ConstraintFlags::REFERENCE_TYPE);
        let err = ConstraintSet::new(vec![bad]).unwrap_err();
        assert_eq!(
            err,
            ConstraintError::Conflicting {
                parameter: "T".into()
            }
        );
    }

    #[test]
    fn implied_conflict_is_rejected() {
        let bad = ParamConstraints::new("T")
            .with_flags(ConstraintFlags::UNMANAGED | ConstraintFlags::REFERENCE_TYPE);
        assert!(ConstraintSet::new(vec![bad]).is_err());
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let err = ConstraintSet::unconstrained(["T", "T"]).unwrap_err();
        assert!(matches!(err, ConstraintError::DuplicateParameter { .. }));
    }

    #[test]
    fn satisfies_checks_every_requirement() {
        let constraints = ParamConstraints::new("T")
            .with_flags(ConstraintFlags::UNMANAGED)
            .require_operator(Operator::Equals);

        let int = ConcreteType::unmanaged("Int32").with_operator(Operator::Equals);
        assert!(satisfies(&int, &constraints));

        let no_eq = ConcreteType::unmanaged("Handle");
        assert_eq!(
            constraints.check(&no_eq),
            Err(Requirement::Operator {
                op: Operator::Equals,
                form: OperatorForm::comparison()
            })
        );

        let string = ConcreteType::reference("String").with_operator(Operator::Equals);
        assert_eq!(constraints.check(&string), Err(Requirement::ValueType));
        assert_eq!(
            constraints.violations(&string),
            vec![Requirement::ValueType, Requirement::Unmanaged]
        );
    }

    #[test]
    fn declaration_order_does_not_change_result() {
        let a = ParamConstraints::new("T")
            .require_override("Hash")
            .require_operator(Operator::Equals)
            .with_flags(ConstraintFlags::READONLY);
        let b = ParamConstraints::new("T")
            .with_flags(ConstraintFlags::READONLY)
            .require_operator(Operator::Equals)
            .require_override("Hash");
        let ty = ConcreteType::reference("Thing");
        assert_eq!(a.violations(&ty), b.violations(&ty));
        assert_eq!(a, b);
    }

    #[test]
    fn must_override_is_checked() {
        let constraints = ParamConstraints::new("T").require_override("Hash");
        assert!(!constraints.satisfied_by(&ConcreteType::reference("Key")));
        assert!(constraints.satisfied_by(&ConcreteType::reference("Key").with_override("Hash")));
    }

    #[test]
    fn subsumption_is_monotonic() {
        let a = ConstraintSet::new(vec![value_t()]).unwrap();
        let b = ConstraintSet::new(vec![value_t().require_operator(Operator::LessThan)]).unwrap();
        assert!(subsumes(&b, &a));
        assert!(!subsumes(&a, &b));
        assert!(subsumes(&a, &a));
    }

    #[test]
    fn stricter_flag_subsumes_implied_flag() {
        let iface = ConstraintSet::new(vec![value_t()]).unwrap();
        let imp = ConstraintSet::new(vec![
            ParamConstraints::new("U").with_flags(ConstraintFlags::ENUM),
        ])
        .unwrap();
        assert!(subsumes(&imp, &iface));
        assert!(!subsumes(&iface, &imp));
    }

    #[test]
    fn first_unsubsumed_names_position() {
        let iface = ConstraintSet::new(vec![
            ParamConstraints::new("K"),
            ParamConstraints::new("V").require_override("Clone"),
        ])
        .unwrap();
        let imp = ConstraintSet::unconstrained(["K", "V"]).unwrap();
        let violation = imp.first_unsubsumed(&iface).unwrap();
        assert_eq!(violation.position, 1);
        assert_eq!(violation.parameter, "V");
        assert_eq!(violation.requirement, Requirement::MustOverride("Clone".into()));
    }

    #[test]
    fn different_arity_never_subsumes() {
        let one = ConstraintSet::unconstrained(["T"]).unwrap();
        let two = ConstraintSet::unconstrained(["T", "U"]).unwrap();
        assert!(!one.subsumes(&two));
        assert!(!two.subsumes(&one));
    }

    #[test]
    fn check_arguments_reports_failing_position() {
        let set = ConstraintSet::new(vec![
            ParamConstraints::new("K"),
            ParamConstraints::new("V").with_flags(ConstraintFlags::REFERENCE_TYPE),
        ])
        .unwrap();
        let args = [ConcreteType::reference("String"), ConcreteType::unmanaged("Int32")];
        let violation = set.check_arguments(&args).unwrap_err();
        assert_eq!(violation.position, 1);
        assert_eq!(violation.requirement, Requirement::ReferenceType);
        assert!(!set.accepts(&args));
    }

    #[test]
    fn fingerprint_ignores_declaration_order_of_operators() {
        let a = ConstraintSet::new(vec![
            ParamConstraints::new("T")
                .require_operator(Operator::Add)
                .require_operator(Operator::Equals),
        ])
        .unwrap();
        let b = ConstraintSet::new(vec![
            ParamConstraints::new("T")
                .require_operator(Operator::Equals)
                .require_operator(Operator::Add),
        ])
        .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn implied_flag_spellings_are_equal() {
        let short = ParamConstraints::new("T").with_flags(ConstraintFlags::ENUM);
        let long = ParamConstraints::new("T").with_flags(
            ConstraintFlags::ENUM | ConstraintFlags::UNMANAGED | ConstraintFlags::VALUE_TYPE,
        );
        assert_eq!(short, long);

        let literal = ParamConstraints {
            flags: ConstraintFlags::ENUM,
            ..ParamConstraints::new("T")
        };
        let a = ConstraintSet::new(vec![literal]).unwrap();
        let b = ConstraintSet::new(vec![long]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
