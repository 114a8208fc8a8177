//! Goal planner
//!
//! Planning strategies are interchangeable: the rule-based planner always
//! works, and an LLM-backed oracle is consulted first for goals that look
//! ambiguous. Oracle failures fall back to the rules without surfacing.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

use super::oracle::{proposal_from_response, should_use_alternate_planner};
use super::prompts::{build_goal_message, GOAL_PLANNING_PROMPT};
use super::rules::RuleBasedPlanner;
use super::types::{PageContext, Plan, PlanProposal};

/// A way of turning a goal into a plan
#[async_trait]
pub trait PlanStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Produce a plan for `goal`, optionally grounded in the current page
    async fn plan(&self, goal: &str, context: Option<&PageContext>) -> Result<PlanProposal>;
}

/// Plans goals by asking an LLM and validating what comes back
pub struct OraclePlanner {
    client: Arc<dyn LlmClient>,
}

impl OraclePlanner {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlanStrategy for OraclePlanner {
    fn name(&self) -> &'static str {
        "oracle"
    }

    async fn plan(&self, goal: &str, context: Option<&PageContext>) -> Result<PlanProposal> {
        let messages = vec![Message::user(build_goal_message(goal, context))];
        let response = self
            .client
            .send_message_with_system(&messages, Some(GOAL_PLANNING_PROMPT))
            .await?;

        let text = response.text();
        tracing::debug!("🤖 Oracle response: {}", text);

        let proposal = proposal_from_response(&text)?;
        tracing::info!(
            "🤖 Oracle planned {} commands with confidence {:.2}",
            proposal.commands.len(),
            proposal.confidence
        );
        Ok(proposal)
    }
}

/// Routes each goal to the oracle or the rules
pub struct GoalPlanner {
    rules: RuleBasedPlanner,
    oracle: Option<Arc<dyn PlanStrategy>>,
}

impl GoalPlanner {
    /// Rule-based planning only
    pub fn rules_only() -> Self {
        Self {
            rules: RuleBasedPlanner::new(),
            oracle: None,
        }
    }

    /// Consult `oracle` for eligible goals
    pub fn with_oracle(oracle: Arc<dyn PlanStrategy>) -> Self {
        Self {
            rules: RuleBasedPlanner::new(),
            oracle: Some(oracle),
        }
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Plan a goal. An empty plan means nothing could be understood.
    pub async fn plan(&self, goal: &str, context: Option<&PageContext>) -> Plan {
        if let Some(oracle) = self.oracle.as_ref() {
            if should_use_alternate_planner(goal) {
                tracing::info!("Using {} planner for goal: {}", oracle.name(), goal);
                match oracle.plan(goal, context).await {
                    Ok(proposal) if !proposal.is_empty() => return proposal.commands,
                    Ok(_) => {
                        tracing::warn!("⚠️  {} planner returned no commands, falling back to rules", oracle.name());
                    }
                    Err(e) => {
                        tracing::warn!("⚠️  {} planner failed: {}, falling back to rules", oracle.name(), e);
                    }
                }
            }
        }

        self.rules.plan_goal(goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ContentBlock, LlmResponse};
    use crate::planning::types::Command;
    use std::sync::Mutex;

    /// LLM stub returning a canned reply and recording the prompt it saw
    struct CannedLlm {
        reply: Result<String, String>,
        seen: Mutex<Vec<String>>,
    }

    impl CannedLlm {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn send_message_with_system(
            &self,
            messages: &[Message],
            _system_prompt: Option<&str>,
        ) -> Result<LlmResponse> {
            let ContentBlock::Text { text } = &messages[0].content[0];
            self.seen.lock().unwrap().push(text.clone());
            match &self.reply {
                Ok(text) => Ok(LlmResponse {
                    message: Message::assistant(vec![ContentBlock::Text { text: text.clone() }]),
                    usage: None,
                }),
                Err(e) => Err(anyhow::anyhow!(e.clone())),
            }
        }

        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
    }

    const ORACLE_REPLY: &str = r##"{"intent": "search", "steps": [
        {"action": "navigate", "url": "https://allrecipes.com"},
        {"action": "input", "selector": "#search", "text": "lasagna"}
    ], "confidence": 0.7}"##;

    #[tokio::test]
    async fn test_oracle_used_for_eligible_goal() {
        let llm = CannedLlm::new(Ok(ORACLE_REPLY));
        let planner = GoalPlanner::with_oracle(Arc::new(OraclePlanner::new(llm.clone())));

        let plan = planner
            .plan("find a recipe for lasagna and show me reviews", None)
            .await;
        assert_eq!(
            plan,
            vec![
                Command::navigate("https://allrecipes.com"),
                Command::input("#search", "lasagna"),
            ]
        );
        assert_eq!(llm.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_oracle_skipped_for_simple_goal() {
        let llm = CannedLlm::new(Ok(ORACLE_REPLY));
        let planner = GoalPlanner::with_oracle(Arc::new(OraclePlanner::new(llm.clone())));

        let plan = planner.plan("go to github.com", None).await;
        assert_eq!(plan, vec![Command::navigate("https://github.com")]);
        assert!(llm.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_rules() {
        let llm = CannedLlm::new(Err("connection refused"));
        let planner = GoalPlanner::with_oracle(Arc::new(OraclePlanner::new(llm)));

        let plan = planner.plan("please open github.com", None).await;
        assert_eq!(plan, vec![Command::navigate("https://github.com")]);
    }

    #[tokio::test]
    async fn test_oracle_garbage_falls_back_to_rules() {
        let llm = CannedLlm::new(Ok("Sure! I would navigate somewhere."));
        let planner = GoalPlanner::with_oracle(Arc::new(OraclePlanner::new(llm)));

        let plan = planner.plan("please open github.com", None).await;
        assert_eq!(plan, vec![Command::navigate("https://github.com")]);
    }

    #[tokio::test]
    async fn test_page_context_reaches_the_prompt() {
        let llm = CannedLlm::new(Ok(ORACLE_REPLY));
        let planner = GoalPlanner::with_oracle(Arc::new(OraclePlanner::new(llm.clone())));
        let ctx = PageContext {
            url: "https://shop.com/laptops".to_string(),
            title: "Laptops".to_string(),
            ..Default::default()
        };

        planner.plan("pick the cheapest laptop", Some(&ctx)).await;
        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].contains("https://shop.com/laptops"));
    }

    #[tokio::test]
    async fn test_rules_only_planner() {
        let planner = GoalPlanner::rules_only();
        assert!(!planner.has_oracle());
        assert!(planner.plan("hello there", None).await.is_empty());
    }
}
