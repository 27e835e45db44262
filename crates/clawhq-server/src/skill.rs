//! Integration documents served to agents.

const SKILL_MD: &str = include_str!("templates/SKILL.md");
const HEARTBEAT_MD: &str = include_str!("templates/HEARTBEAT.md");

/// Values substituted into the document templates.
#[derive(Debug, Clone)]
pub struct SkillContext {
    pub base_url: String,
    pub heartbeat_seconds: u64,
    pub poll_seconds: u64,
}

impl SkillContext {
    pub fn api_base(&self) -> String {
        api_base(&self.base_url)
    }

    pub fn skill_url(&self) -> String {
        skill_url(&self.base_url)
    }

    fn render(&self, template: &str) -> String {
        template
            .replace("API_BASE_PLACEHOLDER", &self.api_base())
            .replace("BASE_URL_PLACEHOLDER", &self.base_url)
            .replace(
                "HEARTBEAT_SECONDS_PLACEHOLDER",
                &self.heartbeat_seconds.to_string(),
            )
            .replace("POLL_SECONDS_PLACEHOLDER", &self.poll_seconds.to_string())
    }
}

pub fn api_base(base_url: &str) -> String {
    format!("{base_url}/api/v1")
}

pub fn skill_url(base_url: &str) -> String {
    format!("{base_url}/skills/clawhq/SKILL.md")
}

pub fn render_skill(ctx: &SkillContext) -> String {
    ctx.render(SKILL_MD)
}

pub fn render_heartbeat(ctx: &SkillContext) -> String {
    ctx.render(HEARTBEAT_MD)
}
