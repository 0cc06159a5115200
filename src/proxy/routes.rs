//! Static route table.
//!
//! Each entry pairs an inbound pattern with the upstream path it forwards to.
//! Parameters are written `{name}` in both, and captured values are copied
//! into the upstream path exactly as they arrived (still percent-encoded).

use axum::routing::MethodFilter;
use reqwest::Method;

/// Verbs the route table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn as_method(self) -> Method {
        match self {
            RouteMethod::Get => Method::GET,
            RouteMethod::Post => Method::POST,
            RouteMethod::Patch => Method::PATCH,
            RouteMethod::Delete => Method::DELETE,
        }
    }

    pub fn filter(self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
            RouteMethod::Patch => MethodFilter::PATCH,
            RouteMethod::Delete => MethodFilter::DELETE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Name used in logs
    pub name: &'static str,
    pub method: RouteMethod,
    /// Inbound path pattern, e.g. `/jobs/{job_id}`
    pub inbound: &'static str,
    /// Upstream path template relative to the origin, e.g. `jobs/{job_id}`
    pub upstream: &'static str,
}

const fn route(
    name: &'static str,
    method: RouteMethod,
    inbound: &'static str,
    upstream: &'static str,
) -> RouteDescriptor {
    RouteDescriptor {
        name,
        method,
        inbound,
        upstream,
    }
}

use RouteMethod::{Delete, Get, Patch, Post};

pub static ROUTES: &[RouteDescriptor] = &[
    // Jobs
    route("list_jobs", Get, "/jobs", "jobs"),
    route("create_job", Post, "/jobs", "jobs"),
    route("get_job", Get, "/jobs/{job_id}", "jobs/{job_id}"),
    route("get_job_status", Get, "/jobs/{job_id}/status", "jobs/{job_id}/status"),
    route("update_job", Patch, "/jobs/{job_id}", "jobs/{job_id}"),
    route("delete_job", Delete, "/jobs/{job_id}", "jobs/{job_id}"),
    route("pause_job", Post, "/jobs/{job_id}/pause", "jobs/{job_id}/pause"),
    route("resume_job", Post, "/jobs/{job_id}/resume", "jobs/{job_id}/resume"),
    // Conversation binding
    route(
        "get_job_for_conversation",
        Get,
        "/jobs/conversation/{conversation_id}",
        "jobs/conversation/{conversation_id}",
    ),
    route(
        "attach_job_to_conversation",
        Post,
        "/jobs/conversation/{conversation_id}/attach",
        "jobs/conversation/{conversation_id}/attach",
    ),
    // Orientation hierarchy
    route(
        "get_directive",
        Get,
        "/jobs/orientation/directives/{directive_id}",
        "jobs/orientation/directives/{directive_id}",
    ),
    route(
        "update_directive",
        Patch,
        "/jobs/orientation/directives/{directive_id}",
        "jobs/orientation/directives/{directive_id}",
    ),
    route(
        "get_mission",
        Get,
        "/jobs/orientation/missions/{mission_id}",
        "jobs/orientation/missions/{mission_id}",
    ),
    route(
        "get_mandate",
        Get,
        "/jobs/orientation/mandates/{mandate_id}",
        "jobs/orientation/mandates/{mandate_id}",
    ),
    // Governance
    route(
        "list_proposals",
        Get,
        "/jobs/governance/proposals",
        "jobs/governance/proposals",
    ),
    route(
        "get_pending_count",
        Get,
        "/jobs/governance/pending-count",
        "jobs/governance/pending-count",
    ),
    route(
        "approve_proposal",
        Post,
        "/jobs/governance/proposals/{proposal_id}/approve",
        "jobs/governance/proposals/{proposal_id}/approve",
    ),
    route(
        "reject_proposal",
        Post,
        "/jobs/governance/proposals/{proposal_id}/reject",
        "jobs/governance/proposals/{proposal_id}/reject",
    ),
];

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

/// True for values a URL parser would resolve as `.` or `..`.
///
/// `%2e` counts as a dot in either case, and a backslash is a path separator for
/// http(s) URLs.
fn is_unsafe_segment(segment: &str) -> bool {
    if segment.contains('\\') {
        return true;
    }
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

impl RouteDescriptor {
    /// Matches `path` against the inbound pattern.
    ///
    /// Returns the captured parameters in pattern order, or `None` if the
    /// path has a different shape, a literal segment differs or a value is
    /// a dot segment.
    pub fn capture<'a>(&self, path: &'a str) -> Option<Vec<(&'static str, &'a str)>> {
        let mut pattern = self.inbound.trim_start_matches('/').split('/');
        let mut actual = path.trim_start_matches('/').split('/');
        let mut params = Vec::new();

        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(expected), Some(segment)) => match param_name(expected) {
                    Some(_) if segment.is_empty() || is_unsafe_segment(segment) => return None,
                    Some(name) => params.push((name, segment)),
                    None if expected == segment => {}
                    None => return None,
                },
                _ => return None,
            }
        }
    }

    /// Upstream path for a concrete inbound `path`.
    pub fn upstream_path(&self, path: &str) -> Option<String> {
        let params = self.capture(path)?;
        let segments = self
            .upstream
            .split('/')
            .map(|segment| match param_name(segment) {
                Some(name) => params
                    .iter()
                    .find(|(param, _)| *param == name)
                    .map(|(_, value)| *value),
                None => Some(segment),
            })
            .collect::<Option<Vec<_>>>()?;

        Some(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_name(name: &str) -> &'static RouteDescriptor {
        ROUTES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn static_route_has_no_params() {
        let route = by_name("list_jobs");
        assert_eq!(route.capture("/jobs"), Some(vec![]));
        assert_eq!(route.upstream_path("/jobs").as_deref(), Some("jobs"));
    }

    #[test]
    fn substitutes_job_id() {
        let route = by_name("get_job_status");
        assert_eq!(route.capture("/jobs/42/status"), Some(vec![("job_id", "42")]));
        assert_eq!(
            route.upstream_path("/jobs/42/status").as_deref(),
            Some("jobs/42/status")
        );
    }

    #[test]
    fn keeps_encoded_values_verbatim() {
        let route = by_name("get_job");
        assert_eq!(
            route.upstream_path("/jobs/a%2Fb%20c").as_deref(),
            Some("jobs/a%2Fb%20c")
        );
    }

    #[test]
    fn rejects_mismatched_paths() {
        let route = by_name("pause_job");
        assert_eq!(route.capture("/jobs/1/resume"), None);
        assert_eq!(route.capture("/jobs/1"), None);
        assert_eq!(route.capture("/jobs//pause"), None);
        assert_eq!(route.capture("/jobs/1/pause/extra"), None);
    }

    #[test]
    fn rejects_dot_segment_values() {
        let route = by_name("get_job_status");
        for path in [
            "/jobs/../status",
            "/jobs/./status",
            "/jobs/%2e%2e/status",
            "/jobs/%2E./status",
            "/jobs/.%2E/status",
            "/jobs/%2e/status",
            "/jobs/a\\..\\b/status",
        ] {
            assert_eq!(route.capture(path), None, "{path}");
        }
        assert_eq!(route.capture("/jobs/.../status"), Some(vec![("job_id", "...")]));
        assert_eq!(route.capture("/jobs/v1.2/status"), Some(vec![("job_id", "v1.2")]));
    }

    #[test]
    fn every_template_param_is_captured() {
        for route in ROUTES {
            let pattern_params: Vec<_> = route.inbound.split('/').filter_map(param_name).collect();
            let template_params: Vec<_> = route.upstream.split('/').filter_map(param_name).collect();
            assert_eq!(pattern_params, template_params, "route {}", route.name);
        }
    }

    #[test]
    fn upstream_mirrors_inbound_path() {
        for route in ROUTES {
            assert_eq!(
                route.upstream,
                route.inbound.trim_start_matches('/'),
                "route {}",
                route.name
            );
        }
    }
}
