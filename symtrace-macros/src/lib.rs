//! `#[symbolic]`: routes the arithmetic operators of a function body through
//! `symtrace::ops`, so proxies passed in are intercepted by the active
//! language context.

use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{
    BinOp, Expr, ItemFn, UnOp,
    fold::{self, Fold},
    parse_macro_input,
};

fn symtrace_crate() -> proc_macro2::TokenStream {
    match crate_name("symtrace") {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::symtrace),
    }
}

/// Rewrites `+ - * / % << >> & | ^` and unary `-` (except on a literal)
/// into calls to `ops::binary` / `ops::unary`, each followed by `?`. The
/// function must therefore return a `Result` whose error type accepts
/// `ProxyError`.
///
/// Operands are converted with `Value::from`; plain variables are cloned
/// first so they stay usable. Compound assignment is rejected.
#[proc_macro_attribute]
pub fn symbolic(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    let mut rewriter = OperatorRewriter {
        krate: symtrace_crate(),
        counter: 1,
    };
    let output = rewriter.fold_item_fn(input_fn);
    TokenStream::from(quote!(#output))
}

struct OperatorRewriter {
    krate: proc_macro2::TokenStream,
    counter: usize,
}

impl OperatorRewriter {
    fn fresh(&mut self, prefix: &str) -> syn::Ident {
        let idx = self.counter;
        self.counter += 1;
        format_ident!("__{}_{}", prefix, idx)
    }

    fn operand(&self, expr: Expr) -> proc_macro2::TokenStream {
        let krate = &self.krate;
        match expr {
            Expr::Path(_) => quote! {
                #krate::value::Value::from(::core::clone::Clone::clone(&#expr))
            },
            other => quote! { #krate::value::Value::from(#other) },
        }
    }
}

fn binary_op(op: &BinOp) -> Option<&'static str> {
    Some(match op {
        BinOp::Add(_) => "Add",
        BinOp::Sub(_) => "Sub",
        BinOp::Mul(_) => "Mul",
        BinOp::Div(_) => "TrueDivide",
        BinOp::Rem(_) => "Mod",
        BinOp::Shl(_) => "Lshift",
        BinOp::Shr(_) => "Rshift",
        BinOp::BitAnd(_) => "LogicalAnd",
        BinOp::BitOr(_) => "LogicalOr",
        BinOp::BitXor(_) => "LogicalXor",
        _ => return None,
    })
}

fn is_compound_assign(op: &BinOp) -> bool {
    matches!(
        op,
        BinOp::AddAssign(_)
            | BinOp::SubAssign(_)
            | BinOp::MulAssign(_)
            | BinOp::DivAssign(_)
            | BinOp::RemAssign(_)
            | BinOp::ShlAssign(_)
            | BinOp::ShrAssign(_)
            | BinOp::BitAndAssign(_)
            | BinOp::BitOrAssign(_)
            | BinOp::BitXorAssign(_)
    )
}

impl Fold for OperatorRewriter {
    fn fold_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Binary(bin) if is_compound_assign(&bin.op) => syn::parse_quote! {
                compile_error!("compound assignment is not supported in a #[symbolic] fn")
            },
            Expr::Binary(bin) => match binary_op(&bin.op) {
                Some(op) => {
                    let op = format_ident!("{}", op);
                    let lhs = self.fold_expr(*bin.left);
                    let rhs = self.fold_expr(*bin.right);
                    let lhs = self.operand(lhs);
                    let rhs = self.operand(rhs);
                    let tmp_l = self.fresh("tmp_l");
                    let tmp_r = self.fresh("tmp_r");
                    let krate = &self.krate;
                    syn::parse_quote! {{
                        let #tmp_l = #lhs;
                        let #tmp_r = #rhs;
                        #krate::ops::binary(#krate::ops::BinaryOp::#op, &#tmp_l, &#tmp_r)?
                    }}
                }
                None => fold::fold_expr(self, Expr::Binary(bin)),
            },
            // Negative literals stay literals.
            Expr::Unary(u) if matches!(u.op, UnOp::Neg(_)) && !matches!(*u.expr, Expr::Lit(_)) => {
                let inner = self.fold_expr(*u.expr);
                let inner = self.operand(inner);
                let tmp_in = self.fresh("tmp_in");
                let krate = &self.krate;
                syn::parse_quote! {{
                    let #tmp_in = #inner;
                    #krate::ops::unary(#krate::ops::UnaryOp::Neg, &#tmp_in)?
                }}
            }
            other => fold::fold_expr(self, other),
        }
    }
}
