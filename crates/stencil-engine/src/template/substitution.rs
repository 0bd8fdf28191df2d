//! Type substitution for template instantiation.
//!
//! Signatures are substituted structurally over [`TypeRef`]. Member bodies are
//! opaque text, so they are substituted token-wise: only whole identifiers
//! outside string literals and comments are replaced.

use std::ops::Range;

use rustc_hash::FxHashMap;
use stencil_core::{
    ConcreteType, ConstraintSet, MatchFailureKind, MemberSignature, Param, TemplateName, TypeRef,
};

/// Map from template parameter name to concrete type.
pub type SubstitutionMap = FxHashMap<String, TypeRef>;

/// Build a substitution map from a parameter list and type arguments.
///
/// # Errors
/// Returns `ArityMismatch` if the number of arguments doesn't match the
/// number of parameters.
pub fn build_substitution_map(
    template: &TemplateName,
    params: &ConstraintSet,
    type_args: &[ConcreteType],
) -> Result<SubstitutionMap, MatchFailureKind> {
    if params.arity() != type_args.len() {
        return Err(MatchFailureKind::ArityMismatch {
            template: template.clone(),
            expected: params.arity(),
            got: type_args.len(),
        });
    }

    let mut map = FxHashMap::default();
    for (name, arg) in params.names().zip(type_args) {
        map.insert(name.to_string(), arg.ty.clone());
    }
    Ok(map)
}

/// Map each parameter of `from` to the parameter at the same position of `to`.
///
/// Used to compare an interface's signatures with an implementation's, which
/// may name its parameters differently.
pub fn rename_map(from: &ConstraintSet, to: &ConstraintSet) -> SubstitutionMap {
    from.names()
        .zip(to.names())
        .map(|(a, b)| (a.to_string(), TypeRef::param(b)))
        .collect()
}

/// Substitute template parameters in a type.
pub fn substitute_type(ty: &TypeRef, subst_map: &SubstitutionMap) -> TypeRef {
    match ty {
        TypeRef::Param(name) => subst_map.get(name).cloned().unwrap_or_else(|| ty.clone()),
        TypeRef::Named { name, args } => TypeRef::Named {
            name: name.clone(),
            args: args
                .iter()
                .map(|arg| substitute_type(arg, subst_map))
                .collect(),
        },
    }
}

/// Substitute template parameters in a member signature.
pub fn substitute_signature(sig: &MemberSignature, subst_map: &SubstitutionMap) -> MemberSignature {
    MemberSignature {
        name: sig.name.clone(),
        params: sig
            .params
            .iter()
            .map(|p| Param::new(p.name.clone(), substitute_type(&p.ty, subst_map)))
            .collect(),
        returns: substitute_type(&sig.returns, subst_map),
    }
}

/// Substitute template parameters in member body text.
pub fn substitute_body(body: &str, subst_map: &SubstitutionMap) -> String {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for range in identifiers(body) {
        if let Some(replacement) = subst_map.get(&body[range.clone()]) {
            out.push_str(&body[last..range.start]);
            out.push_str(&replacement.to_string());
            last = range.end;
        }
    }
    out.push_str(&body[last..]);
    out
}

/// Byte ranges of the identifiers in `text`, skipping string and character
/// literals and `//` / `/* */` comments.
pub fn identifiers(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'"' | b'\'' => i = skip_literal(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            _ if is_ident_start(b) => {
                let start = i;
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                out.push(start..i);
            }
            _ if b.is_ascii_digit() => {
                // Numeric literals, including suffixes like `1u32`.
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    out
}

fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, TypeRef)]) -> SubstitutionMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn build_substitution_map_success() {
        let params = ConstraintSet::unconstrained(["K", "V"]).unwrap();
        let args = [ConcreteType::reference("String"), ConcreteType::unmanaged("Int32")];
        let map = build_substitution_map(&"Map".into(), &params, &args).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("K"), Some(&TypeRef::named("String")));
        assert_eq!(map.get("V"), Some(&TypeRef::named("Int32")));
    }

    #[test]
    fn build_substitution_map_count_mismatch() {
        let params = ConstraintSet::unconstrained(["K", "V"]).unwrap();
        let args = [ConcreteType::unmanaged("Int32")];
        let err = build_substitution_map(&"Map".into(), &params, &args).unwrap_err();
        assert_eq!(
            err,
            MatchFailureKind::ArityMismatch {
                template: "Map".into(),
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn substitute_nested_type() {
        let ty = TypeRef::generic(
            "Map",
            vec![
                TypeRef::param("K"),
                TypeRef::generic("List", vec![TypeRef::param("V")]),
            ],
        );
        let subst = map(&[("K", TypeRef::named("String")), ("V", TypeRef::named("Int32"))]);
        let result = substitute_type(&ty, &subst);
        assert!(result.is_closed());
        assert_eq!(result.to_string(), "Map<String, List<Int32>>");
    }

    #[test]
    fn substitute_leaves_unknown_params() {
        let subst = map(&[("T", TypeRef::named("Int32"))]);
        assert_eq!(substitute_type(&TypeRef::param("U"), &subst), TypeRef::param("U"));
    }

    #[test]
    fn substitute_signature_params_and_return() {
        let sig = MemberSignature::new(
            "get",
            vec![Param::new("index", TypeRef::named("Int32"))],
            TypeRef::param("T"),
        );
        let subst = map(&[("T", TypeRef::named("Float64"))]);
        let result = substitute_signature(&sig, &subst);
        assert_eq!(result.to_string(), "get(index: Int32) -> Float64");
    }

    #[test]
    fn body_substitution_is_whole_identifier() {
        let subst = map(&[("T", TypeRef::named("Int32"))]);
        let body = "let tmp: T = T::default(); let Total = TT + T1;";
        assert_eq!(
            substitute_body(body, &subst),
            "let tmp: Int32 = Int32::default(); let Total = TT + T1;"
        );
    }

    #[test]
    fn body_substitution_skips_literals_and_comments() {
        let subst = map(&[("T", TypeRef::named("Int32"))]);
        let body = "log(\"T is \\\"T\\\"\"); // T here\nreturn 'T' == x as T; /* T */";
        assert_eq!(
            substitute_body(body, &subst),
            "log(\"T is \\\"T\\\"\"); // T here\nreturn 'T' == x as Int32; /* T */"
        );
    }

    #[test]
    fn body_substitution_renders_generic_arguments() {
        let subst = map(&[("T", TypeRef::generic("List", vec![TypeRef::named("Int32")]))]);
        assert_eq!(substitute_body("new T()", &subst), "new List<Int32>()");
    }

    #[test]
    fn identifiers_skip_numeric_suffixes() {
        let text = "a + 1u32 - b_2";
        let idents: Vec<&str> = identifiers(text).into_iter().map(|r| &text[r]).collect();
        assert_eq!(idents, vec!["a", "b_2"]);
    }

    #[test]
    fn rename_map_by_position() {
        let from = ConstraintSet::unconstrained(["T"]).unwrap();
        let to = ConstraintSet::unconstrained(["U"]).unwrap();
        let renamed = rename_map(&from, &to);
        assert_eq!(renamed.get("T"), Some(&TypeRef::param("U")));
    }
}
