//! First-order approximation.
//!
//! When pattern unification does not apply to `?m a₁..aₙ =?= g b₁..bₘ`, the
//! problem is decomposed argument-wise: the two spines are aligned from the
//! right, excess leading arguments are folded back into the head on the
//! longer side, and the aligned positions plus the heads are equated
//! individually.  This is unsound for some dependent instantiations; it is
//! only reached after the precise strategies have been exhausted, and the
//! kernel re-checks downstream.

use log::trace;

use ast::print::PrintToString;
use ast::{Expr, TransparencyMode};

use crate::result::TcResult;
use crate::TypeChecker;

impl TypeChecker<'_> {
    /// Argument-wise decomposition of a flexible application against
    /// another term, unfolding the rigid side as a last resort.
    pub(crate) fn is_def_eq_fo(&mut self, flex: &Expr, rigid: &Expr) -> TcResult<bool> {
        let mut rigid = rigid.clone();
        loop {
            if self.commit_when(|tc| tc.is_def_eq_fo_core(flex, &rigid))? {
                return Ok(true);
            }
            // The decomposition may only become possible after exposing an
            // application on the rigid side; unfold ignoring transparency.
            let unfolded = self
                .with_transparency(TransparencyMode::All, |tc| tc.unfold_definition(&rigid));
            match unfolded {
                Some(next) => rigid = self.whnf_core(&next)?,
                None => return Ok(false),
            }
        }
    }

    fn is_def_eq_fo_core(&mut self, flex: &Expr, rigid: &Expr) -> TcResult<bool> {
        let (flex_fn, flex_args) = flex.get_app_fn_args();
        let (rigid_fn, rigid_args) = rigid.get_app_fn_args();
        if flex_args.is_empty() || rigid_args.is_empty() {
            return Ok(false);
        }
        trace!("first-order {} =?= {}", flex.print_to_string(), rigid.print_to_string());

        let k = flex_args.len().min(rigid_args.len());
        // Aligned trailing arguments are equated from the right; their
        // solutions feed the head comparison that comes last.
        for i in (0..k).rev() {
            let a = &flex_args[flex_args.len() - k + i];
            let b = &rigid_args[rigid_args.len() - k + i];
            if !self.is_def_eq(a, b)? {
                return Ok(false);
            }
        }
        let flex_head = Expr::apps(flex_fn.clone(), &flex_args[..flex_args.len() - k]);
        let rigid_head = Expr::apps(rigid_fn.clone(), &rigid_args[..rigid_args.len() - k]);
        self.is_def_eq(&flex_head, &rigid_head)
    }
}
