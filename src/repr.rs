//! Bounded, cycle-safe textual representation of a decoded value
//! (distilled spec §4.8), grounded on the buffer-and-context-stack renderer
//! in `original_source/marshal48/ruby_repr.c`.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::errors::{MarshalError, Result};
use crate::session::Session;
use crate::value::{Object, ObjectId, Value};

/// Output longer than this is truncated with a trailing ellipsis, mirroring
/// the original's reserved-tail-space mechanism.
const DEFAULT_BUDGET: usize = 256;
const TAIL_RESERVE: usize = 16;

/// Result of a non-strict rendering: the text, plus whether a back-reference
/// to an object already on the current path was encountered. A cycle is the
/// normal, documented case for a genuinely cyclic stream, not a failure.
pub struct Rendered {
    pub text: String,
    pub saw_cycle: bool,
}

/// Renders with the default byte budget, treating a cycle as the ordinary
/// case: re-encountering an object renders `@<id>` and `saw_cycle` is set.
pub fn represent(value: Value, session: &Session) -> Result<Rendered> {
    represent_with(value, session, DEFAULT_BUDGET, false)
}

/// Renders with an explicit byte budget and strictness. In strict mode, a
/// cycle aborts the whole render with `MarshalError::CycleDuringRender`
/// instead of being folded into the output — for callers (e.g. a formatting
/// mode asserting acyclic input) that want a cycle treated as fatal.
pub fn represent_with(value: Value, session: &Session, budget: usize, strict: bool) -> Result<Rendered> {
    let mut ctx = RenderCtx {
        out: String::new(),
        visiting: HashSet::new(),
        budget,
        strict,
        saw_cycle: false,
    };
    write_value(&mut ctx, value, session)?;
    if ctx.out.len() > budget {
        let mut cut = budget.saturating_sub(TAIL_RESERVE);
        while cut > 0 && !ctx.out.is_char_boundary(cut) {
            cut -= 1;
        }
        ctx.out.truncate(cut);
        ctx.out.push_str("...");
    }
    Ok(Rendered {
        text: ctx.out,
        saw_cycle: ctx.saw_cycle,
    })
}

struct RenderCtx {
    out: String,
    visiting: HashSet<ObjectId>,
    budget: usize,
    strict: bool,
    saw_cycle: bool,
}

fn write_value(ctx: &mut RenderCtx, value: Value, session: &Session) -> Result<()> {
    if ctx.out.len() > ctx.budget {
        return Ok(());
    }
    match value {
        Value::Nil => ctx.out.push_str("nil"),
        Value::True => ctx.out.push_str("true"),
        Value::False => ctx.out.push_str("false"),
        Value::Int(i) => {
            let _ = write!(ctx.out, "{i}");
        }
        Value::Symbol(id) => {
            let _ = write!(ctx.out, ":{}", session.symbol(id)?.name_lossy());
        }
        Value::Object(id) => write_object(ctx, id, session)?,
    }
    Ok(())
}

fn write_object(ctx: &mut RenderCtx, id: ObjectId, session: &Session) -> Result<()> {
    if !ctx.visiting.insert(id) {
        if ctx.strict {
            return Err(MarshalError::CycleDuringRender);
        }
        ctx.saw_cycle = true;
        let _ = write!(ctx.out, "@{}", id);
        return Ok(());
    }
    let result = write_object_inner(ctx, id, session);
    ctx.visiting.remove(&id);
    result
}

fn write_object_inner(ctx: &mut RenderCtx, id: ObjectId, session: &Session) -> Result<()> {
    match session.object(id)?.clone() {
        Object::String(s) => {
            let _ = write!(ctx.out, "{:?}", String::from_utf8_lossy(&s.bytes));
        }
        Object::Array(items) => {
            ctx.out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    ctx.out.push_str(", ");
                }
                write_value(ctx, *item, session)?;
            }
            ctx.out.push(']');
        }
        Object::Hash(pairs) => {
            ctx.out.push('{');
            for (i, (key, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    ctx.out.push_str(", ");
                }
                write_value(ctx, *key, session)?;
                ctx.out.push_str(" => ");
                write_value(ctx, *value, session)?;
            }
            ctx.out.push('}');
        }
        Object::GenericObject(g) => {
            let _ = write!(ctx.out, "#<{}", g.class_name);
            for (key, value) in &g.attributes {
                let name = session.symbol(*key)?.name_lossy();
                let _ = write!(ctx.out, " @{}=", name);
                write_value(ctx, *value, session)?;
            }
            ctx.out.push('>');
        }
        Object::UserDefined(u) => {
            let _ = write!(ctx.out, "#<{} ({} bytes)>", u.class_name, u.data.len());
        }
        Object::UserMarshal(u) => {
            let _ = write!(ctx.out, "#<{} ", u.class_name);
            write_value(ctx, u.data, session)?;
            ctx.out.push('>');
        }
    }
    Ok(())
}
