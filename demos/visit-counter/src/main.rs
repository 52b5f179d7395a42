use std::collections::HashMap;

use docsession::lifecycle::DEFAULT_FLASH_QUEUE;
use docsession::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// App types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Route {
    Home,
    Login(String),
    Profile,
    Logout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    name: String,
    since_visit: u64,
}

struct Response {
    status: u16,
    body: String,
    cookies: Vec<SetCookie>,
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

struct App<S: SessionStore> {
    factory: SessionFactory<S>,
}

impl<S: SessionStore> App<S> {
    /// One request: resolve the session, run the route, collect cookies.
    async fn handle(&self, cookie_header: &str, route: Route) -> Response {
        let scope = RequestScope::from_cookie_header(cookie_header);
        let result = self.dispatch(&scope, route).await;
        let cookies = scope.finish(result.is_err()).into_cookies();
        match result {
            Ok(body) => Response { status: 200, body, cookies },
            Err(e) => {
                tracing::warn!(error = %e, "request failed");
                Response { status: 500, body: e.to_string(), cookies }
            }
        }
    }

    async fn dispatch(&self, scope: &RequestScope, route: Route) -> Result<String, DocsessionError> {
        let mut session = self.factory.session(scope).await?;
        let visits = session.get::<u64>("visits").await?.unwrap_or(0) + 1;
        session.insert("visits", visits).await?;

        let body = match route {
            Route::Home => {
                let messages = session.pop_flash(DEFAULT_FLASH_QUEUE).await?;
                let notes: Vec<String> = messages
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect();
                format!("visit #{visits} notes: {notes:?}")
            }
            Route::Login(name) => {
                session
                    .insert("user", User { name: name.clone(), since_visit: visits })
                    .await?;
                session.flash(format!("welcome, {name}"), DEFAULT_FLASH_QUEUE, false).await?;
                let token = session.get_csrf_token().await?;
                format!("logged in as {name} (csrf {token})")
            }
            Route::Profile => match session.get::<User>("user").await? {
                Some(user) => format!("{} since visit #{}", user.name, user.since_visit),
                None => "anonymous".to_string(),
            },
            Route::Logout => {
                session.invalidate().await?;
                "logged out".to_string()
            }
        };
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

/// Holds cookies between requests the way a browser would.
#[derive(Default)]
struct Browser {
    jar: HashMap<String, String>,
}

impl Browser {
    fn cookie_header(&self) -> String {
        self.jar
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn absorb(&mut self, cookies: &[SetCookie]) {
        for cookie in cookies {
            if cookie.is_removal() {
                self.jar.remove(cookie.name());
            } else {
                self.jar.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
    }

    async fn visit<S: SessionStore>(&mut self, app: &App<S>, route: Route) -> Response {
        let response = app.handle(&self.cookie_header(), route).await;
        self.absorb(&response.cookies);
        response
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    docsession::init_tracing();

    let settings = SessionSettings::from_settings([
        ("docsession.secret", "visit-counter-demo-secret"),
        ("docsession.timeout", "900"),
        ("docsession.cookie_name", "visit"),
        ("docsession.cookie_httponly", "true"),
    ])?;
    let config = settings.to_config(&IdGeneratorRegistry::new())?;
    let app = App { factory: SessionFactory::new(config, MemoryStore::new()) };

    let mut browser = Browser::default();
    let script = [
        Route::Home,
        Route::Login("ada".into()),
        Route::Home,
        Route::Profile,
        Route::Logout,
        Route::Profile,
    ];
    for route in script {
        let label = format!("{route:?}");
        let response = browser.visit(&app, route).await;
        println!("{label:<16} {} {}", response.status, response.body);
        for cookie in &response.cookies {
            println!("{:<16} Set-Cookie: {cookie}", "");
        }
    }
    println!("sessions left in store: {}", app.factory.store().len().await);
    Ok(())
}
