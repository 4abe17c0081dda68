//! Host-invoked callbacks and the write-notify scan

use crate::api::ApiContext;
use mlua::{Function, IntoLuaMulti};

/// Scan passes allowed when watch callbacks keep writing to watched memory
const MAX_SCAN_PASSES: usize = 8;

/// Send a script error to the log and to the host's error channel
pub(crate) fn report_error(ctx: &ApiContext, message: &str) {
    tracing::error!("{}", message);
    ctx.host.borrow_mut().report_error(message);
}

/// Call `callback` with its own watchdog budget. The caller's budget is
/// restored afterwards.
pub(crate) fn call_with_budget(
    ctx: &ApiContext,
    callback: &Function,
    args: impl IntoLuaMulti,
    budget: u32,
) -> mlua::Result<()> {
    let saved = {
        let mut session = ctx.session.borrow_mut();
        session.callback_depth += 1;
        session.watchdog.swap_remaining(budget)
    };

    let result = callback.call::<()>(args);

    let mut session = ctx.session.borrow_mut();
    session.callback_depth -= 1;
    session.watchdog.swap_remaining(saved);
    result
}

/// Run the watch callbacks of every watched byte whose value changed.
///
/// Called after a write commits. A scan started while another one is
/// running is folded into an extra pass of the outer scan.
pub(crate) fn notify_writes(ctx: &ApiContext) {
    let budget = {
        let mut session = ctx.session.borrow_mut();
        if !session.running || !session.watches.in_use() {
            return;
        }
        if session.scan_active {
            session.rescan = true;
            return;
        }
        session.scan_active = true;
        session.callback_budget
    };

    for pass in 1..=MAX_SCAN_PASSES {
        scan_once(ctx, budget);

        let mut session = ctx.session.borrow_mut();
        if !session.rescan {
            break;
        }
        session.rescan = false;
        if pass == MAX_SCAN_PASSES {
            tracing::warn!(
                "Watched memory still changing after {} scan passes",
                MAX_SCAN_PASSES
            );
        }
    }

    ctx.session.borrow_mut().scan_active = false;
}

fn scan_once(ctx: &ApiContext, budget: u32) {
    let addresses = ctx.session.borrow().watches.snapshot();
    for addr in addresses {
        let current = ctx.host.borrow().read_byte(addr);
        let callback = ctx.session.borrow_mut().watches.observe(addr, current);
        if let Some(callback) = callback {
            tracing::trace!("Write watch fired at 0x{:08X}", addr);
            if let Err(e) = call_with_budget(ctx, &callback, (), budget) {
                report_error(ctx, &format!("memory watch at 0x{:08X}: {}", addr, e));
            }
        }
    }
}
