//! The init sequence: provision, hooks, privilege drop, exec

use std::convert::Infallible;
use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use nix::sys::stat::{umask, Mode};
use tracing::debug;

use super::env::InitContract;
use super::hooks::run_hook;
use super::identity::EtcPaths;

/// Where the sequence currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    EnvParsed,
    IdentityProvisioned,
    SkipIdentity,
    RootHookRun,
    PrivilegeDropped,
    SkipDrop,
    UmaskSet,
    UserHookRun,
    Exec,
}

pub struct InitSequence {
    contract: InitContract,
    paths: EtcPaths,
    stage: Stage,
    history: Vec<Stage>,
}

impl InitSequence {
    /// Start from an already-parsed contract.
    pub fn new(contract: InitContract, paths: EtcPaths) -> Self {
        let mut seq = Self {
            contract,
            paths,
            stage: Stage::Start,
            history: vec![Stage::Start],
        };
        seq.enter(Stage::EnvParsed);
        seq
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every stage entered so far, in order.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    fn enter(&mut self, stage: Stage) {
        debug!("{:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        self.history.push(stage);
    }

    /// Run everything up to, but not including, the exec.
    pub fn prepare(&mut self) -> Result<()> {
        let identity = self.contract.identity.clone();

        match &identity {
            Some(id) => {
                id.provision(&self.paths)?;
                self.enter(Stage::IdentityProvisioned);
            }
            None => self.enter(Stage::SkipIdentity),
        }

        if let Some(hook) = &self.contract.root_hook {
            run_hook(hook)?;
        }
        self.enter(Stage::RootHookRun);

        match &identity {
            Some(id) => {
                id.drop_privileges(&self.paths)?;
                self.enter(Stage::PrivilegeDropped);
            }
            None => self.enter(Stage::SkipDrop),
        }

        if let Some(mask) = self.contract.umask {
            let mode = Mode::from_bits(mask).ok_or_else(|| anyhow!("Invalid umask {:o}", mask))?;
            debug!("Setting umask to {:04o}", mask);
            umask(mode);
        }
        self.enter(Stage::UmaskSet);

        // The user hook only makes sense after switching users
        if identity.is_some() {
            if let Some(hook) = &self.contract.user_hook {
                run_hook(hook)?;
            }
        }
        self.enter(Stage::UserHookRun);

        Ok(())
    }

    /// Replace this process with `argv`. Only returns on failure.
    pub fn exec(&mut self, argv: &[OsString]) -> anyhow::Error {
        let Some((program, args)) = argv.split_first() else {
            return anyhow!("Missing command");
        };
        self.enter(Stage::Exec);
        debug!("Executing {:?} with args {:?}", program, args);

        let err = Command::new(program).args(args).exec();
        anyhow::Error::new(err).context(format!("Failed to execute {:?}", program))
    }

    /// Run the whole sequence.
    pub fn run(mut self, argv: &[OsString]) -> Result<Infallible> {
        self.prepare()?;
        Err(self.exec(argv))
    }
}

/// Parse the contract from the process environment and run the sequence.
pub fn run_from_env(argv: &[OsString]) -> Result<Infallible> {
    let contract = InitContract::pop_from_process().context("Invalid environment")?;
    crate::logging::init(contract.verbose);
    InitSequence::new(contract, EtcPaths::default()).run(argv)
}
