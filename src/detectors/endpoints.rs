//! HTTP route declarations
//!
//! Each scanner recognises one family of routing syntax. Scanners work line by
//! line so the reported line number is the line of the route declaration.
//! Route-level and router-level auth middleware both set `auth`.

use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Endpoint, Facet, HttpMethod};
use crate::fs::FileEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

pub struct EndpointsDetector;

static EXPRESS_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(\w+)\.(get|post|put|patch|delete|all)\(\s*['"`](/[^'"`]*)['"`]\s*(?:,\s*(.*))?"#)
        .expect("valid regex")
});

static EXPRESS_USE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\w+)\.use\(\s*([^'`\x22][^)]*)\)").expect("valid regex"));

static GO_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b(\w+)\.(GET|POST|PUT|PATCH|DELETE|Any|Get|Post|Put|Patch|Delete|HandleFunc|Handle)\(\s*"(/[^"]*)"\s*,\s*(.*)\)"#,
    )
    .expect("valid regex")
});

static GO_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\w+)\.Use\((.*)\)").expect("valid regex"));

static GO_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(\w+)\s*:?=\s*(\w+)\.Group\(\s*"([^"]*)"\s*(?:,\s*(.*))?\)"#).expect("valid regex")
});

static PY_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*@(\w+)\.route\(\s*['"]([^'"]*)['"](?:.*methods\s*=\s*\[([^\]]*)\])?"#)
        .expect("valid regex")
});

static PY_METHOD_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*@(\w+)\.(get|post|put|patch|delete)\(\s*['"]([^'"]*)['"]"#).expect("valid regex")
});

static PY_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)\s*\((.*)").expect("valid regex"));

static SPRING_CLASS_MAPPING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*@RequestMapping\(\s*(?:value\s*=\s*|path\s*=\s*)?"([^"]*)""#).expect("valid regex")
});

static SPRING_MAPPING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*@(Get|Post|Put|Patch|Delete)Mapping(?:\(\s*(?:value\s*=\s*|path\s*=\s*)?"([^"]*)")?"#)
        .expect("valid regex")
});

static JAVA_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*public\s+[\w<>\[\], ?]+\s+(\w+)\s*\(").expect("valid regex"));

static NEST_CONTROLLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@Controller\(\s*['"]([^'"]*)['"]"#).expect("valid regex"));

static NEST_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*@(Get|Post|Put|Patch|Delete|All)\(\s*(?:['"]([^'"]*)['"])?\s*\)"#).expect("valid regex")
});

static TS_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:async\s+)?(\w+)\s*\(").expect("valid regex"));

static RAILS_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(get|post|put|patch|delete)\s+['"]([^'"]+)['"](?:\s*,\s*to:\s*['"]([^'"]+)['"])?"#)
        .expect("valid regex")
});

static AUTH_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\w*(auth|jwt|login_required|protect|requireuser|guard|session)\w*").expect("valid regex")
});

const JS_EXTS: &[&str] = &["js", "ts", "mjs", "cjs"];

impl Detector for EndpointsDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Endpoints
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let mut endpoints = Vec::new();

        for entry in ctx.inventory.files() {
            let scanner: fn(&FileEntry, &str) -> Vec<Endpoint> = match entry.ext.as_str() {
                "js" | "mjs" | "cjs" => scan_express,
                "ts" => scan_typescript,
                "go" => scan_go,
                "py" => scan_python,
                "java" | "kt" => scan_spring,
                "rb" if entry.path.ends_with("config/routes.rb") => scan_rails,
                _ => continue,
            };
            if entry.name.contains(".test.") || entry.name.contains(".spec.") || entry.name.ends_with("_test.go") {
                continue;
            }
            let Some(content) = ctx.read_source(entry)? else {
                continue;
            };
            endpoints.extend(scanner(entry, &content));
        }

        Ok(Facet::Endpoints(endpoints))
    }
}

fn endpoint(method: HttpMethod, path: &str, entry: &FileEntry, line: usize) -> Endpoint {
    Endpoint {
        method,
        path: normalize_path(path),
        handler: None,
        file: entry.path.clone(),
        line: Some(line + 1),
        auth: None,
        description: None,
    }
}

/// Ensures a single leading slash and no trailing slash except for the root
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    let path = path.trim().trim_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => normalize_path(path),
        (false, true) => normalize_path(prefix),
        (false, false) => format!("/{}/{}", prefix, path),
    }
}

fn parse_method(token: &str) -> Option<HttpMethod> {
    match token.to_ascii_lowercase().as_str() {
        "handle" | "handlefunc" => Some(HttpMethod::All),
        lower => HttpMethod::from_name(lower),
    }
}

/// First auth-looking identifier in a middleware argument list
fn auth_in(args: &str) -> Option<String> {
    AUTH_HINT.find(args).map(|m| m.as_str().to_string())
}

/// Last bare identifier in an argument list, taken as the handler
fn last_identifier(args: &str) -> Option<String> {
    let last = args
        .trim()
        .trim_end_matches(';')
        .trim_end_matches(')')
        .rsplit(',')
        .next()?
        .trim();
    let is_ident = !last.is_empty()
        && last
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    is_ident.then(|| last.to_string())
}

/// Receivers whose routes inherit auth from a `use`-style call
fn guarded_receivers(content: &str, re: &Regex) -> BTreeSet<String> {
    re.captures_iter(content)
        .filter(|c| auth_in(&c[2]).is_some())
        .map(|c| c[1].to_string())
        .collect()
}

fn scan_express(entry: &FileEntry, content: &str) -> Vec<Endpoint> {
    let guarded = guarded_receivers(content, &EXPRESS_USE);
    let mut out = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let Some(caps) = EXPRESS_ROUTE.captures(line) else {
            continue;
        };
        let Some(method) = parse_method(&caps[2]) else {
            continue;
        };
        let mut ep = endpoint(method, &caps[3], entry, idx);
        let args = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
        let middleware: Vec<&str> = args.split(',').collect();
        if middleware.len() > 1 {
            ep.auth = middleware[..middleware.len() - 1].iter().find_map(|m| auth_in(m));
        }
        if ep.auth.is_none() && guarded.contains(&caps[1]) {
            ep.auth = guarded_auth(content, &EXPRESS_USE, &caps[1]);
        }
        ep.handler = last_identifier(args);
        out.push(ep);
    }
    out
}

fn guarded_auth(content: &str, re: &Regex, receiver: &str) -> Option<String> {
    re.captures_iter(content)
        .filter(|c| &c[1] == receiver)
        .find_map(|c| auth_in(&c[2]))
}

fn scan_typescript(entry: &FileEntry, content: &str) -> Vec<Endpoint> {
    if content.contains("@Controller(") {
        scan_nest(entry, content)
    } else if JS_EXTS.contains(&entry.ext.as_str()) {
        scan_express(entry, content)
    } else {
        Vec::new()
    }
}

fn scan_nest(entry: &FileEntry, content: &str) -> Vec<Endpoint> {
    let prefix = NEST_CONTROLLER
        .captures(content)
        .map(|c| c[1].to_string())
        .unwrap_or_default();
    let class_guarded = content
        .lines()
        .take_while(|l| !l.contains("class "))
        .find(|l| l.contains("@UseGuards("))
        .and_then(auth_in);

    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = NEST_ROUTE.captures(line) else {
            continue;
        };
        let Some(method) = parse_method(&caps[1]) else {
            continue;
        };
        let route = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let mut ep = endpoint(method, &join_paths(&prefix, route), entry, idx);

        for next in lines.iter().skip(idx + 1).take(5) {
            if next.trim_start().starts_with('@') {
                if next.contains("@UseGuards(") {
                    ep.auth = auth_in(next);
                }
                continue;
            }
            ep.handler = TS_METHOD.captures(next).map(|c| c[1].to_string());
            break;
        }
        if ep.auth.is_none() {
            ep.auth = class_guarded.clone();
        }
        out.push(ep);
    }
    out
}

/// Route prefix and inherited auth middleware of each Gin/Echo group receiver
#[derive(Default)]
struct GoGroup {
    prefix: String,
    auth: Option<String>,
}

/// Groups in declaration order, so nested groups see their parent's prefix
fn go_groups(content: &str) -> HashMap<String, GoGroup> {
    let mut groups: HashMap<String, GoGroup> = HashMap::new();
    for caps in GO_GROUP.captures_iter(content) {
        let parent = groups.get(&caps[2]);
        let prefix = join_paths(parent.map_or("", |g| g.prefix.as_str()), &caps[3]);
        let auth = caps
            .get(4)
            .and_then(|m| auth_in(m.as_str()))
            .or_else(|| parent.and_then(|g| g.auth.clone()));
        groups.insert(caps[1].to_string(), GoGroup { prefix, auth });
    }
    groups
}

fn scan_go(entry: &FileEntry, content: &str) -> Vec<Endpoint> {
    let guarded = guarded_receivers(content, &GO_USE);
    let groups = go_groups(content);

    let mut out = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let Some(caps) = GO_ROUTE.captures(line) else {
            continue;
        };
        let Some(method) = parse_method(&caps[2]) else {
            continue;
        };
        let group = groups.get(&caps[1]);
        let path = join_paths(group.map_or("", |g| g.prefix.as_str()), &caps[3]);
        let mut ep = endpoint(method, &path, entry, idx);
        let args = &caps[4];
        let parts: Vec<&str> = args.split(',').collect();
        if parts.len() > 1 {
            ep.auth = parts[..parts.len() - 1].iter().find_map(|m| auth_in(m));
        }
        if ep.auth.is_none() && guarded.contains(&caps[1]) {
            ep.auth = guarded_auth(content, &GO_USE, &caps[1]);
        }
        if ep.auth.is_none() {
            ep.auth = group.and_then(|g| g.auth.clone());
        }
        ep.handler = last_identifier(args);
        out.push(ep);
    }
    out
}

fn scan_python(entry: &FileEntry, content: &str) -> Vec<Endpoint> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let (methods, path) = if let Some(caps) = PY_ROUTE.captures(line) {
            let methods: Vec<HttpMethod> = match caps.get(3) {
                Some(list) => list
                    .as_str()
                    .split(',')
                    .filter_map(|m| parse_method(m.trim().trim_matches(|c| c == '"' || c == '\'')))
                    .collect(),
                None => vec![HttpMethod::Get],
            };
            (methods, caps[2].to_string())
        } else if let Some(caps) = PY_METHOD_ROUTE.captures(line) {
            match parse_method(&caps[2]) {
                Some(method) => (vec![method], caps[3].to_string()),
                None => continue,
            }
        } else {
            continue;
        };

        let mut handler = None;
        let mut auth = None;
        for next in lines.iter().skip(idx + 1).take(6) {
            if let Some(def) = PY_DEF.captures(next) {
                handler = Some(def[1].to_string());
                if auth.is_none() && def[2].contains("Depends(") {
                    auth = auth_in(&def[2]);
                }
                break;
            }
            if next.trim_start().starts_with('@') && auth.is_none() {
                auth = auth_in(next);
            }
        }

        for method in methods {
            let mut ep = endpoint(method, &path, entry, idx);
            ep.handler = handler.clone();
            ep.auth = auth.clone();
            out.push(ep);
        }
    }
    out
}

fn scan_spring(entry: &FileEntry, content: &str) -> Vec<Endpoint> {
    let lines: Vec<&str> = content.lines().collect();
    let class_line = lines.iter().position(|l| l.contains(" class ")).unwrap_or(0);
    let prefix = lines[..class_line]
        .iter()
        .find_map(|l| SPRING_CLASS_MAPPING.captures(l).map(|c| c[1].to_string()))
        .unwrap_or_default();
    let class_auth = lines[..class_line]
        .iter()
        .find(|l| is_spring_security(l))
        .map(|l| l.trim().to_string());

    let mut out = Vec::new();
    for (idx, line) in lines.iter().enumerate().skip(class_line) {
        let Some(caps) = SPRING_MAPPING.captures(line) else {
            continue;
        };
        let Some(method) = parse_method(&caps[1]) else {
            continue;
        };
        let route = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let mut ep = endpoint(method, &join_paths(&prefix, route), entry, idx);

        let annotations_above = lines[..idx]
            .iter()
            .rev()
            .take_while(|l| l.trim_start().starts_with('@'));
        let annotations_below = lines
            .iter()
            .skip(idx + 1)
            .take_while(|l| l.trim_start().starts_with('@'));
        ep.auth = annotations_above
            .chain(annotations_below)
            .find(|l| is_spring_security(l))
            .map(|l| l.trim().to_string())
            .or_else(|| class_auth.clone());
        ep.handler = lines
            .iter()
            .skip(idx + 1)
            .take(5)
            .find_map(|l| JAVA_METHOD.captures(l).map(|c| c[1].to_string()));
        out.push(ep);
    }
    out
}

fn is_spring_security(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("@PreAuthorize") || line.starts_with("@Secured") || line.starts_with("@RolesAllowed")
}

fn scan_rails(entry: &FileEntry, content: &str) -> Vec<Endpoint> {
    let mut out = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let Some(caps) = RAILS_ROUTE.captures(line) else {
            continue;
        };
        let Some(method) = parse_method(&caps[1]) else {
            continue;
        };
        let mut ep = endpoint(method, &caps[2], entry, idx);
        ep.handler = caps.get(3).map(|m| m.as_str().to_string());
        out.push(ep);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn endpoints(files: &[(&str, &str)]) -> Vec<Endpoint> {
        let (_dir, ctx) = context_with(files);
        match EndpointsDetector.detect(&ctx, &empty_analysis(&ctx)).unwrap() {
            Facet::Endpoints(e) => e,
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_express_routes_with_auth_middleware() {
        let eps = endpoints(&[(
            "src/routes/users.js",
            "const router = express.Router();\n\
             router.get('/users', listUsers);\n\
             router.post('/users', requireAuth, createUser);\n",
        )]);

        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].method, HttpMethod::Get);
        assert_eq!(eps[0].path, "/users");
        assert_eq!(eps[0].line, Some(2));
        assert_eq!(eps[0].handler.as_deref(), Some("listUsers"));
        assert_eq!(eps[0].auth, None);
        assert_eq!(eps[1].auth.as_deref(), Some("requireAuth"));
    }

    #[test]
    fn test_router_level_auth() {
        let eps = endpoints(&[(
            "admin.js",
            "admin.use(authenticate);\nadmin.delete('/items/:id', removeItem);\n",
        )]);
        assert_eq!(eps[0].method, HttpMethod::Delete);
        assert_eq!(eps[0].auth.as_deref(), Some("authenticate"));
    }

    #[test]
    fn test_gin_group_auth() {
        let eps = endpoints(&[(
            "main.go",
            "package main\n\
             func routes(r *gin.Engine) {\n\
             \tr.GET(\"/health\", health)\n\
             \tapi := r.Group(\"/api\", AuthMiddleware())\n\
             \tapi.POST(\"/orders\", createOrder)\n\
             }\n",
        )]);

        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].path, "/health");
        assert_eq!(eps[0].auth, None);
        assert_eq!(eps[1].method, HttpMethod::Post);
        assert_eq!(eps[1].path, "/api/orders");
        assert_eq!(eps[1].auth.as_deref(), Some("AuthMiddleware"));
    }

    #[test]
    fn test_go_group_prefixes_nest() {
        let eps = endpoints(&[(
            "main.go",
            "package main\n\
             func routes(r *gin.Engine) {\n\
             \tv1 := r.Group(\"/api/v1\")\n\
             \tv1.GET(\"/users\", listUsers)\n\
             \tadmin := v1.Group(\"/admin\", RequireAuth())\n\
             \tadmin.DELETE(\"/users/:id\", deleteUser)\n\
             \treports := admin.Group(\"reports/\")\n\
             \treports.GET(\"/\", listReports)\n\
             }\n",
        )]);

        let paths: Vec<&str> = eps.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/api/v1/users", "/api/v1/admin/users/:id", "/api/v1/admin/reports"]);
        assert_eq!(eps[0].auth, None);
        assert_eq!(eps[1].auth.as_deref(), Some("RequireAuth"));
        assert_eq!(eps[2].auth.as_deref(), Some("RequireAuth"));
        assert_eq!(eps[2].handler.as_deref(), Some("listReports"));
    }

    #[test]
    fn test_flask_methods_and_decorator_auth() {
        let eps = endpoints(&[(
            "app.py",
            "@app.route('/login', methods=['GET', 'POST'])\n\
             def login():\n    pass\n\n\
             @bp.route('/profile')\n@login_required\ndef profile():\n    pass\n",
        )]);

        let methods: Vec<_> = eps.iter().map(|e| e.method).collect();
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Get]);
        assert_eq!(eps[2].handler.as_deref(), Some("profile"));
        assert_eq!(eps[2].auth.as_deref(), Some("login_required"));
    }

    #[test]
    fn test_spring_prefix_join() {
        let eps = endpoints(&[(
            "src/main/java/App.java",
            "@RestController\n@RequestMapping(\"/api/orders\")\npublic class OrderController {\n\
             \x20   @GetMapping(\"/{id}\")\n    public Order get(Long id) { return null; }\n\
             \x20   @PreAuthorize(\"hasRole('ADMIN')\")\n    @DeleteMapping\n    public void delete() {}\n}\n",
        )]);

        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].path, "/api/orders/{id}");
        assert_eq!(eps[0].handler.as_deref(), Some("get"));
        assert_eq!(eps[0].auth, None);
        assert_eq!(eps[1].path, "/api/orders");
        assert!(eps[1].auth.is_some());
    }

    #[test]
    fn test_rails_routes_get_leading_slash() {
        let eps = endpoints(&[(
            "config/routes.rb",
            "Rails.application.routes.draw do\n  get 'status', to: 'health#show'\nend\n",
        )]);
        assert_eq!(eps[0].path, "/status");
        assert_eq!(eps[0].handler.as_deref(), Some("health#show"));
    }

    #[test]
    fn test_every_path_starts_with_slash() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("users/"), "/users");
        assert_eq!(join_paths("/api/", "/v1"), "/api/v1");
        assert_eq!(join_paths("", ""), "/");
    }
}
