//! Literal-level type detection for deprecation checks.
//!
//! A shallow, assignment-propagated view of value types: enough to tell
//! that `d = {}` then `d + other` concatenates dictionaries, without any
//! real evaluation.

use skylint_syntax::{Expr, File};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LitType {
    Unknown,
    Str,
    Dict,
    List,
    Depset,
}

/// Variable types learned from assignments, in file order. Nested function
/// and block bodies contribute too; names are not scoped, which is the
/// right amount of precision for a deprecation heuristic.
pub(crate) struct TypeEnv {
    vars: HashMap<String, LitType>,
}

impl TypeEnv {
    pub fn of_file(f: &File) -> TypeEnv {
        let mut env = TypeEnv {
            vars: HashMap::new(),
        };
        scan(&f.stmts, &mut env);
        env
    }

    /// The literal type of an expression under this environment.
    pub fn type_of(&self, e: &Expr) -> LitType {
        match e {
            Expr::String(_) => LitType::Str,
            Expr::Dict(_) => LitType::Dict,
            Expr::List(_) => LitType::List,
            Expr::Comprehension(c) if !c.curly => LitType::List,
            Expr::Call(c) => match c.x.as_ref() {
                Expr::Ident(id) if id.name == "depset" => LitType::Depset,
                Expr::Ident(id) if id.name == "dict" => LitType::Dict,
                Expr::Ident(id) if id.name == "list" => LitType::List,
                Expr::Ident(id) if id.name == "str" => LitType::Str,
                _ => LitType::Unknown,
            },
            Expr::Ident(id) => self.vars.get(&id.name).copied().unwrap_or(LitType::Unknown),
            Expr::Paren(p) => self.type_of(&p.x),
            Expr::Binary(b) if b.op == "+" || b.op == "%" => {
                let t = self.type_of(&b.x);
                if t != LitType::Unknown {
                    t
                } else {
                    self.type_of(&b.y)
                }
            }
            _ => LitType::Unknown,
        }
    }
}

fn scan(stmts: &[Expr], env: &mut TypeEnv) {
    for stmt in stmts {
        match stmt {
            Expr::Assign(a) if a.op == "=" => {
                if let Expr::Ident(id) = a.lhs.as_ref() {
                    let t = env.type_of(&a.rhs);
                    env.vars.insert(id.name.clone(), t);
                }
            }
            Expr::Def(d) => scan(&d.function.body, env),
            Expr::For(f) => scan(&f.body, env),
            Expr::If(i) => {
                scan(&i.true_body, env);
                scan(&i.false_body, env);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylint_syntax::{parse_default, FileKind};

    fn env_for(src: &str) -> (File, TypeEnv) {
        let f = parse_default("t.star", src).expect("parse error");
        assert_eq!(f.kind, FileKind::Default);
        let env = TypeEnv::of_file(&f);
        (f, env)
    }

    #[test]
    fn literal_types() {
        let (f, env) = env_for("a = {}\nb = []\nc = \"s\"\nd = depset()\n");
        for (stmt, want) in f.stmts.iter().zip([
            LitType::Dict,
            LitType::List,
            LitType::Str,
            LitType::Depset,
        ]) {
            if let Expr::Assign(a) = stmt {
                assert_eq!(env.type_of(&a.rhs), want);
            } else {
                panic!("expected assignment");
            }
        }
    }

    #[test]
    fn types_propagate_through_variables() {
        let (f, env) = env_for("a = {}\nb = a\nuse(b)\n");
        if let Expr::Call(c) = &f.stmts[2] {
            assert_eq!(env.type_of(&c.list[0]), LitType::Dict);
        } else {
            panic!("expected call");
        }
    }

    #[test]
    fn concatenation_keeps_type() {
        let (f, env) = env_for("a = {}\nx = a + {}\n");
        if let Expr::Assign(assign) = &f.stmts[1] {
            assert_eq!(env.type_of(&assign.rhs), LitType::Dict);
        } else {
            panic!("expected assignment");
        }
    }
}
