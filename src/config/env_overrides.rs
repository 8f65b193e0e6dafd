use super::ChatdeskConfig;

impl ChatdeskConfig {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CHATDESK_API_URL")
            && !url.is_empty()
        {
            self.api_url = url;
        }

        if let Ok(token) =
            std::env::var("CHATDESK_API_TOKEN").or_else(|_| std::env::var("API_TOKEN"))
            && !token.is_empty()
        {
            self.api_token = Some(token);
        }

        if let Ok(raw) = std::env::var("CHATDESK_MAX_CONCURRENCY")
            && let Ok(limit) = raw.parse::<usize>()
            && limit > 0
        {
            self.fetch.max_concurrency = limit;
        }
    }
}
