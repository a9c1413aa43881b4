use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::pipeline::Stage;

pub struct Stage3Session;

impl Stage3Session {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage3Session {
    fn name(&self) -> &'static str {
        "stage3_session"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        if ctx.is_complete() {
            info!("nothing left to fetch; skipping login");
            return Ok(());
        }
        if ctx.system.is_some() {
            return Ok(());
        }

        let connector = ctx
            .connector
            .as_ref()
            .context("no session connector configured")?;
        let system = connector.login(ctx.credentials.as_ref())?;
        info!("session_ready");
        ctx.system = Some(system);
        Ok(())
    }
}
