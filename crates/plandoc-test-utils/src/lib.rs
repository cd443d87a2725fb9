//! Shared test utilities for plandoc integration tests.
//!
//! Provides model clients that never touch the network and the canned
//! "Lunar mining" replies used by the end-to-end tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use plandoc_core::{ModelClient, ModelError};

// ---------------------------------------------------------------------------
// Model clients
// ---------------------------------------------------------------------------

/// Replies from a fixed script, in order, and records every prompt.
///
/// Once the script is exhausted every call fails with
/// [`ModelError::Unavailable`], so a test that makes more calls than it
/// scripted fails loudly.
pub struct ScriptedModelClient {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedModelClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results(results: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script poisoned").len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        let next = self.script.lock().expect("script poisoned").pop_front();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        next.unwrap_or_else(|| {
            Err(ModelError::Unavailable {
                message: "scripted model client has no replies left".to_string(),
            })
        })
    }
}

/// Fails every call with the given error.
pub struct FailingModelClient {
    error: ModelError,
}

impl FailingModelClient {
    pub fn new(error: ModelError) -> Self {
        Self { error }
    }

    pub fn unavailable() -> Self {
        Self::new(ModelError::Unavailable {
            message: "connection refused".to_string(),
        })
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::new(ModelError::RateLimited {
            message: "quota exceeded".to_string(),
            retry_after,
        })
    }
}

#[async_trait]
impl ModelClient for FailingModelClient {
    fn model(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(self.error.clone())
    }
}

/// Never replies. Only cancellation gets a caller out.
pub struct PendingModelClient;

#[async_trait]
impl ModelClient for PendingModelClient {
    fn model(&self) -> &str {
        "pending"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Lunar mining fixture
// ---------------------------------------------------------------------------

/// Canned replies for a three-phase "Lunar mining" plan.
pub mod lunar {
    pub const TITLE: &str = "Lunar mining";
    pub const OBJECTIVE: &str = "Extract Helium-3 from lunar regolith and return it to Earth";
    pub const SEED_PROMPT: &str =
        "Write a strategic overview for a commercial Lunar mining venture focused on Helium-3.";

    /// Phases in the plan.
    pub const PHASES: usize = 3;
    /// Objectives across all phases (2 + 3 + 1).
    pub const OBJECTIVES: usize = 6;
    /// Resource categories across all phases (2 + 2 + 1).
    pub const RESOURCE_CATEGORIES: usize = 5;
    /// Resource items across all phases (5 + 3 + 2).
    pub const RESOURCE_ITEMS: usize = 10;

    pub const PHASE_HEADINGS: [&str; 3] = ["Phase 1", "Phase 2", "Phase 3"];

    pub const OVERVIEW: &str = "\
## Strategic Overview

Helium-3 is scarce on Earth but deposited in lunar regolith by the solar wind. \
A commercial venture can survey the polar regions, deploy modular extraction \
plants and ship refined Helium-3 back to Earth for fusion research.

The venture depends on **reliable launch capacity**, autonomous robotics and \
long-term offtake agreements with research reactors.";

    pub const PHASES_REPLY: &str = "\
Here is a phased plan for the Lunar mining project:

**Phase 1: Site Survey and Prospecting (Months 1-12)**
- Timeline: Months 1-12
- Description: Orbital mapping and robotic prospecting of candidate sites.

**Phase 2: Infrastructure Deployment (Months 13-30)**
- Timeline: Months 13-30
- Description: Land habitats, power and processing equipment.

**Phase 3: Extraction and Return (Months 31-60)**
- Timeline: Months 31-60
- Description: Mine regolith, refine Helium-3 and ship it to Earth.

Note: timelines assume funding is secured up front.";

    pub const OBJECTIVES_1: &str = "\
Here are the objectives for this phase:

1. **Map candidate sites**
   - Acquire high-resolution orbital imagery of polar craters
   - Build a regolith composition model from spectrometer data
   - Rank sites by Helium-3 concentration
   - Assess landing hazards at each site
   - Publish a shortlist of three sites

2. **Prospect the shortlisted sites:**
   - Land two robotic prospectors
   - Drill core samples to two meters
   - Measure volatile content in situ
   - Return sample data to mission control
   - Confirm the primary extraction site";

    pub const RESOURCES_1: &str = "\
**Hardware**
- Orbital spectrometer: Maps surface composition from orbit
- Robotic prospector: Drills and analyzes core samples
- Communications relay: Links surface assets with Earth

**Personnel:**
- Planetary geologists: Interpret survey data
- Mission controllers";

    pub const OBJECTIVES_2: &str = "\
### 1. Deploy the surface habitat
   - Land pressurized modules
   - Connect life support
### 2. Establish power
   - Deploy solar arrays on crater rims
   - Install battery storage for the lunar night
### 3. Commission the processing plant
   - Assemble regolith heaters
   - Validate gas separation";

    pub const RESOURCES_2: &str = "\
**Equipment**
- Regolith excavator: Feeds the processing plant
- Solar array: Powers the outpost

**Money**
- Launch budget: Covers heavy-lift launches";

    pub const OBJECTIVES_3: &str = "\
1. Operate the extraction cycle
   - Excavate regolith continuously
   - Refine and liquefy Helium-3
   - Ship canisters to Earth quarterly";

    pub const RESOURCES_3: &str = "\
- Stray line before any category
**Minerals**
- Helium-3: Primary export product
- Water ice: Supports life support and propellant";

    /// Every reply of the plan pipeline, in call order.
    pub fn plan_script() -> Vec<&'static str> {
        vec![
            OVERVIEW,
            PHASES_REPLY,
            OBJECTIVES_1,
            RESOURCES_1,
            OBJECTIVES_2,
            RESOURCES_2,
            OBJECTIVES_3,
            RESOURCES_3,
        ]
    }

    /// Model calls one plan request makes: overview, phases, then two per phase.
    pub const PLAN_CALLS: usize = 2 + 2 * PHASES;

    pub const KEY_THEMES: &str = "\
Key themes:
- Helium-3 scarcity on Earth
- Autonomous lunar robotics
- Launch economics";

    pub const INSIGHTS: &str = "\
1. Polar craters hold the richest deposits
2. Processing energy dominates operating cost";

    pub const TAKEAWAYS: &str = "\
- Secure offtake agreements before Phase 2
- Standardize surface modules";

    pub const EVIDENCE: &str = "\
* Apollo 11 regolith samples measured Helium-3 concentrations";

    /// Every reply of the summary pipeline, in call order.
    pub fn summary_script() -> Vec<&'static str> {
        vec![OVERVIEW, KEY_THEMES, INSIGHTS, TAKEAWAYS, EVIDENCE]
    }
}
