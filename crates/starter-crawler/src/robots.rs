use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use reqwest::header::USER_AGENT;
use texting_robots::Robot;
use url::Url;

/// robots.txt rules, fetched once per origin.
pub struct RobotsCache {
    user_agent: String,
    client: reqwest::Client,
    robots: Mutex<HashMap<String, Option<Arc<Robot>>>>,
}

impl RobotsCache {
    pub fn new(user_agent: &str) -> Result<Self> {
        Ok(Self {
            user_agent: user_agent.to_string(),
            client: reqwest::ClientBuilder::new().gzip(true).deflate(true).build()?,
            robots: Mutex::new(HashMap::new()),
        })
    }

    /// A missing or unreadable robots.txt allows everything.
    pub async fn allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return true;
        };
        let origin = parsed.origin().ascii_serialization();

        let cached = self
            .robots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&origin)
            .cloned();
        let robot = match cached {
            Some(robot) => robot,
            None => {
                let robot = self.fetch(&origin).await.map(Arc::new);
                self.robots
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(origin, robot.clone());
                robot
            }
        };

        robot.map_or(true, |robot| robot.allowed(url))
    }

    async fn fetch(&self, origin: &str) -> Option<Robot> {
        let robots_url = format!("{origin}/robots.txt");
        let txt: Result<_, reqwest::Error> = async {
            let resp = self
                .client
                .get(&robots_url)
                .header(USER_AGENT, &self.user_agent)
                .send()
                .await?
                .error_for_status()?;
            resp.bytes().await
        }
        .await;

        match txt {
            Ok(txt) => match Robot::new(&self.user_agent, &txt) {
                Ok(robot) => Some(robot),
                Err(e) => {
                    log::warn!("Ignoring invalid {robots_url} got: {e}");
                    None
                }
            },
            Err(e) => {
                log::debug!("No robots.txt at {robots_url}: {e}");
                None
            }
        }
    }
}
