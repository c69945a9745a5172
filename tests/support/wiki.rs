//! Wiremock stand-in for the login pages, the entries endpoint and the
//! public extract endpoint.

use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, Respond, ResponseTemplate};

use readinglist_core::Endpoints;

pub const LOGIN_PATH: &str = "/wiki/Special:UserLogin";
pub const HOP1_PATH: &str = "/auth/hop1";
pub const HOP2_PATH: &str = "/auth/hop2";
pub const ENTRIES_PATH: &str = "/lists/1/entries/";
pub const EXTRACTS_PATH: &str = "/w/api.php";
pub const LOGIN_TOKEN: &str = "tok123+\\";

/// Endpoints pointing at `server`.
pub fn endpoints(server: &MockServer) -> Endpoints {
    let base = server.uri();
    Endpoints {
        login_url: format!("{base}{LOGIN_PATH}"),
        entries_url: format!("{base}{ENTRIES_PATH}"),
        extracts_url: format!(
            "{base}{EXTRACTS_PATH}?format=json&action=query&prop=extracts&exintro&explaintext&redirects=0&titles="
        ),
    }
}

pub fn login_page() -> String {
    format!(
        r#"<html><form><input name="wpName"><input name="wpLoginToken" type="hidden" value="{LOGIN_TOKEN}"></form></html>"#
    )
}

/// Matches requests whose `Cookie` header carries `name=value`.
pub struct CookieContains(pub &'static str);

impl Match for CookieContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.split(';').any(|pair| pair.trim() == self.0))
    }
}

/// Matches requests without the given query parameter.
pub struct NoQueryParam(pub &'static str);

impl Match for NoQueryParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == self.0)
    }
}

/// Mounts the full four-step login flow, each step expected `times` times.
pub async fn mount_login(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .append_header("set-cookie", "enwikiSession=anon; path=/; HttpOnly")
                .set_body_string(login_page()),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(body_string_contains("wpName=alice"))
        .and(body_string_contains("wpLoginToken=tok123%2B%5C"))
        .and(CookieContains("enwikiSession=anon"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}{HOP1_PATH}", server.uri()).as_str())
                .append_header("set-cookie", "enwikiSession=s2; path=/")
                .append_header("set-cookie", "enwikiUserName=alice; path=/"),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(HOP1_PATH))
        .and(CookieContains("enwikiSession=s2"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", HOP2_PATH)
                .append_header("set-cookie", "centralauth_Session=c1; path=/"),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(HOP2_PATH))
        .and(CookieContains("centralauth_Session=c1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/wiki/Main_Page")
                .append_header("set-cookie", "centralauth_Token=t9; path=/"),
        )
        .expect(times)
        .mount(server)
        .await;
}

pub fn entries(titles: &[&str]) -> Vec<Value> {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| json!({"id": i, "title": title, "created": format!("2024-01-{:02}T00:00:00Z", i + 1)}))
        .collect()
}

/// Mounts a paginated entries endpoint.
///
/// `pages[i]` is served for the `i`-th request; every page but the last
/// carries a `next` cursor pointing at the following one.
pub async fn mount_entries(server: &MockServer, pages: &[Vec<Value>], times: u64) {
    let last = pages.len().saturating_sub(1);
    for (index, page) in pages.iter().enumerate() {
        let mut body = json!({ "entries": page });
        if index < last {
            body["next"] = json!(format!("cursor/{}", index + 1));
        }
        let template = ResponseTemplate::new(200).set_body_json(body);
        let mock = Mock::given(method("GET"))
            .and(path(ENTRIES_PATH))
            .and(CookieContains("centralauth_Token=t9"));
        let mock = if index == 0 {
            mock.and(NoQueryParam("next"))
                .respond_with(template)
        } else {
            mock.and(query_param("next", format!("cursor/{index}").as_str()))
                .respond_with(template)
        };
        mock.expect(times).mount(server).await;
    }
}

/// Answers a batch with one page per requested title, extract text taken
/// from `text_for`. Titles for which it returns `None` come back without an
/// extract field.
pub struct ExtractResponder {
    pub text_for: fn(&str) -> Option<String>,
}

impl Respond for ExtractResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let titles = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "titles")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        let mut pages = serde_json::Map::new();
        for (index, title) in titles.split('|').filter(|t| !t.is_empty()).enumerate() {
            let mut page = json!({ "pageid": index + 100, "ns": 0, "title": title });
            if let Some(text) = (self.text_for)(title) {
                page["extract"] = json!(text);
            }
            pages.insert((index + 100).to_string(), page);
        }
        ResponseTemplate::new(200).set_body_json(json!({ "batchcomplete": "", "query": { "pages": pages } }))
    }
}

pub fn short_extract(title: &str) -> Option<String> {
    Some(format!("About {title}.\nSecond line."))
}

pub async fn mount_extracts(server: &MockServer, text_for: fn(&str) -> Option<String>) {
    Mock::given(method("GET"))
        .and(path(EXTRACTS_PATH))
        .and(query_param("action", "query"))
        .and(query_param("prop", "extracts"))
        .respond_with(ExtractResponder { text_for })
        .mount(server)
        .await;
}

/// Requests the server received on `path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == request_path)
        .collect()
}

/// Titles requested in one extract batch, in request order.
pub fn batch_titles(request: &Request) -> Vec<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == "titles")
        .map(|(_, value)| value.split('|').map(str::to_string).collect())
        .unwrap_or_default()
}
