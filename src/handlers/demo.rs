//! Scripted rebinding scenario.
//!
//! A `Frontend` component depends on a `Greeter`. Providers are registered,
//! re-ranked and withdrawn while the frontend keeps serving greetings
//! through a [`ComponentGate`]; each step records which provider is bound.

use anyhow::{Result, bail};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use svcbind_core::{
    Callbacks, ComponentGate, Properties, RebindStrategy, SERVICE_LANGUAGE, SERVICE_RANKING,
    Settings,
};
use svcbind_registry::ServiceRegistry;
use tracing::info;

const GREETER: &str = "Greeter";

/// Provider interface used by the demo.
pub trait Greeter: Send + Sync {
    fn name(&self) -> &str;
    fn greet(&self, who: &str) -> String;
}

struct Phrase {
    name: &'static str,
    template: &'static str,
}

impl Greeter for Phrase {
    fn name(&self) -> &str {
        self.name
    }

    fn greet(&self, who: &str) -> String {
        self.template.replace("{}", who)
    }
}

/// The consuming component.
struct Frontend {
    gate: Arc<ComponentGate>,
    greeter: Mutex<Option<Arc<dyn Greeter>>>,
}

impl Frontend {
    fn bind(&self, greeter: Option<Arc<dyn Greeter>>) {
        info!(greeter = greeter.as_ref().map(|g| g.name()), "Frontend rebound");
        *self.greeter.lock().unwrap_or_else(PoisonError::into_inner) = greeter;
    }

    fn greet(&self, who: &str) -> Option<String> {
        let _entered = self.gate.enter();
        self.greeter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|g| g.greet(who))
    }

    fn bound_name(&self) -> Option<String> {
        self.greeter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|g| g.name().to_string())
    }
}

/// State after one scripted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoStep {
    pub action: String,
    pub bound: Option<String>,
    pub greeting: Option<String>,
    pub satisfied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub strategy: RebindStrategy,
    pub steps: Vec<DemoStep>,
}

impl fmt::Display for DemoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "strategy: {}", self.strategy)?;
        for step in &self.steps {
            writeln!(
                f,
                "{:<32} bound={:<8} satisfied={:<5} {}",
                step.action,
                step.bound.as_deref().unwrap_or("-"),
                step.satisfied,
                step.greeting.as_deref().unwrap_or(""),
            )?;
        }
        Ok(())
    }
}

fn phrase(name: &'static str, template: &'static str) -> Arc<dyn Greeter> {
    Arc::new(Phrase { name, template })
}

fn properties(ranking: i64, language: &str) -> Properties {
    Properties::from([
        (SERVICE_RANKING.to_string(), ranking.to_string()),
        (SERVICE_LANGUAGE.to_string(), language.to_string()),
    ])
}

/// Run the scenario with `strategy`, or the settings default.
pub fn execute_demo(settings: &Settings, strategy: Option<RebindStrategy>) -> Result<DemoReport> {
    let registry = Arc::new(ServiceRegistry::new());
    let ctx = registry.context().with_settings(settings.clone())?;
    let strategy = strategy.unwrap_or_else(|| settings.effective_strategy());
    let language = settings.effective_language_tag().to_string();

    let gate = Arc::new(ComponentGate::new());
    let frontend = Arc::new(Frontend {
        gate: gate.clone(),
        greeter: Mutex::new(None),
    });

    let mut dependency = ctx.dependency::<Arc<dyn Greeter>>(gate, GREETER);
    if !dependency.is_valid() {
        bail!("Failed to create the {GREETER} dependency");
    }
    dependency
        .set_strategy(strategy)
        .set_required(true)
        .set_callbacks(Callbacks::bound_set(&frontend, Frontend::bind));

    let mut steps = Vec::new();
    let mut record = |action: String| {
        steps.push(DemoStep {
            action,
            bound: frontend.bound_name(),
            greeting: frontend.greet("world"),
            satisfied: dependency.is_satisfied(),
        });
    };

    record("start".to_string());
    let english = registry.register(GREETER, phrase("english", "Hello, {}!"), properties(0, &language));
    record(format!("register english ({})", english.id()));
    let french = registry.register(GREETER, phrase("french", "Bonjour, {} !"), properties(10, &language));
    record(format!("register french ({}, rank 10)", french.id()));
    registry.set_properties(english.id(), properties(20, &language))?;
    record("re-rank english to 20".to_string());
    registry.unregister(english.id())?;
    record("unregister english".to_string());
    registry.unregister(french.id())?;
    record("unregister french".to_string());

    Ok(DemoReport { strategy, steps })
}
