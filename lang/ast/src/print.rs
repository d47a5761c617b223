//! Compact pretty printing for terms and levels.
//!
//! This printer is aimed at traces and diagnostics: bound variables are shown
//! by index and metavariables by identifier, so the output is unambiguous
//! without a local context at hand.

use pretty::DocAllocator;

use crate::exp::{Expr, ExprKind, Literal};
use crate::level::Level;

pub type Alloc<'a> = pretty::Arena<'a>;
pub type Builder<'a> = pretty::DocBuilder<'a, Alloc<'a>>;

/// Operator precedences
pub type Precedence = u32;

const PREC_BINDER: Precedence = 0;
const PREC_ARROW: Precedence = 1;
const PREC_APP: Precedence = 2;
const PREC_ATOM: Precedence = 3;

pub const DEFAULT_WIDTH: usize = 100;

pub trait Print<'a> {
    fn print(&'a self, alloc: &'a Alloc<'a>) -> Builder<'a> {
        Print::print_prec(self, alloc, 0)
    }

    /// Print with precedence information about the enclosing context.
    fn print_prec(&'a self, alloc: &'a Alloc<'a>, _prec: Precedence) -> Builder<'a> {
        Print::print(self, alloc)
    }
}

pub trait PrintToString {
    fn print_to_string(&self) -> String;
}

impl<T: for<'a> Print<'a>> PrintToString for T {
    fn print_to_string(&self) -> String {
        let alloc = Alloc::new();
        let mut buf = Vec::new();
        let doc = self.print(&alloc);
        if doc.1.render(DEFAULT_WIDTH, &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn parens_if(cond: bool, doc: Builder<'_>) -> Builder<'_> {
    if cond { doc.parens() } else { doc }
}

impl<'a> Print<'a> for Level {
    fn print_prec(&'a self, alloc: &'a Alloc<'a>, prec: Precedence) -> Builder<'a> {
        match self.to_offset() {
            (Level::Zero, n) => alloc.text(n.to_string()),
            (base, 0) => match base {
                Level::Max(l, r) => parens_if(
                    prec >= PREC_APP,
                    alloc
                        .text("max ")
                        .append(l.print_prec(alloc, PREC_APP))
                        .append(alloc.space())
                        .append(r.print_prec(alloc, PREC_APP)),
                ),
                Level::IMax(l, r) => parens_if(
                    prec >= PREC_APP,
                    alloc
                        .text("imax ")
                        .append(l.print_prec(alloc, PREC_APP))
                        .append(alloc.space())
                        .append(r.print_prec(alloc, PREC_APP)),
                ),
                Level::Param(name) => alloc.text(name.to_string()),
                _ => alloc.text("0"),
            },
            (base, n) => parens_if(
                prec >= PREC_APP,
                base.print_prec(alloc, PREC_APP).append(alloc.text(format!("+{n}"))),
            ),
        }
    }
}

impl<'a> Print<'a> for Expr {
    fn print_prec(&'a self, alloc: &'a Alloc<'a>, prec: Precedence) -> Builder<'a> {
        match self.kind() {
            ExprKind::BVar(i) => alloc.text(format!("#{i}")),
            ExprKind::FVar(id) => alloc.text(id.to_string()),
            ExprKind::MVar(id) => alloc.text(id.to_string()),
            ExprKind::Sort(l) => {
                if l.is_zero() {
                    alloc.text("Prop")
                } else {
                    parens_if(
                        prec >= PREC_APP,
                        alloc.text("Sort ").append(l.print_prec(alloc, PREC_APP)),
                    )
                }
            }
            ExprKind::Const(name, levels) => {
                let head = alloc.text(name.to_string());
                if levels.is_empty() {
                    head
                } else {
                    head.append(alloc.text(".{")).append(
                        alloc
                            .intersperse(
                                levels.iter().map(|l| l.print(alloc)),
                                alloc.text(", "),
                            )
                            .append(alloc.text("}")),
                    )
                }
            }
            ExprKind::App(..) => {
                let (f, args) = app_spine(self);
                let doc = f.print_prec(alloc, PREC_APP).append(
                    alloc
                        .concat(
                            args.iter()
                                .map(|a| alloc.line().append(a.print_prec(alloc, PREC_ATOM))),
                        )
                        .nest(2),
                );
                parens_if(prec >= PREC_ATOM, doc.group())
            }
            ExprKind::Lam(b, body) => {
                let doc = alloc
                    .text(format!("fun ({} : ", b.name))
                    .append(b.ty.print_prec(alloc, PREC_BINDER))
                    .append(alloc.text(") =>"))
                    .append(alloc.line().append(body.print_prec(alloc, PREC_BINDER)).nest(2));
                parens_if(prec > PREC_BINDER, doc.group())
            }
            ExprKind::Pi(b, body) => {
                let doc = if body.loose_bvar_range() == 0 {
                    b.ty.print_prec(alloc, PREC_APP)
                        .append(alloc.text(" -> "))
                        .append(body.print_prec(alloc, PREC_ARROW))
                } else {
                    alloc
                        .text(format!("({} : ", b.name))
                        .append(b.ty.print_prec(alloc, PREC_BINDER))
                        .append(alloc.text(") -> "))
                        .append(body.print_prec(alloc, PREC_ARROW))
                };
                parens_if(prec >= PREC_APP, doc.group())
            }
            ExprKind::Let(b, value, body) => {
                let doc = alloc
                    .text(format!("let {} : ", b.name))
                    .append(b.ty.print_prec(alloc, PREC_BINDER))
                    .append(alloc.text(" := "))
                    .append(value.print_prec(alloc, PREC_BINDER))
                    .append(alloc.text(";"))
                    .append(alloc.line())
                    .append(body.print_prec(alloc, PREC_BINDER));
                parens_if(prec > PREC_BINDER, doc.group())
            }
            ExprKind::Lit(Literal::Nat(n)) => alloc.text(n.to_string()),
            ExprKind::Lit(Literal::Str(s)) => alloc.text(format!("{s:?}")),
            ExprKind::Proj(_, idx, e) => {
                e.print_prec(alloc, PREC_ATOM).append(alloc.text(format!(".{idx}")))
            }
            ExprKind::MData(_, e) => e.print_prec(alloc, prec),
        }
    }
}

/// Borrowed spine decomposition, so the printed subterms share the
/// lifetime of the printed expression.
fn app_spine(e: &Expr) -> (&Expr, Vec<&Expr>) {
    let mut args = Vec::new();
    let mut cur = e;
    while let ExprKind::App(f, a) = cur.kind() {
        args.push(a);
        cur = f;
    }
    args.reverse();
    (cur, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exp::{Binder, FVarId, MVarId};

    #[test]
    fn prints_applications_atomically() {
        let e = Expr::apps(Expr::const_("f", vec![]), &[Expr::nat(1), Expr::fvar(FVarId(3))]);
        assert_eq!(e.print_to_string(), "f 1 x3");
    }

    #[test]
    fn prints_lambda_and_mvar() {
        let e = Expr::lam(Binder::new("x", Expr::prop()), Expr::mvar(MVarId(2)));
        assert_eq!(e.print_to_string(), "fun (x : Prop) => ?m2");
    }

    #[test]
    fn prints_nondependent_pi_as_arrow() {
        let a = Expr::const_("A", vec![]);
        let b = Expr::const_("B", vec![]);
        let e = Expr::pi(Binder::new("x", a), b);
        assert_eq!(e.print_to_string(), "A -> B");
    }

    #[test]
    fn prints_level_offsets() {
        let l = Level::succ(Level::Param("u".into()));
        assert_eq!(l.print_to_string(), "u+1");
        assert_eq!(Level::of_nat(2).print_to_string(), "2");
    }
}
