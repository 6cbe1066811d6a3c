//! Library and idiom usage found by scanning source files
//!
//! Every rule is a regex over file contents restricted to a set of
//! extensions. A pattern is reported with the number of files it matched and
//! the first few matching paths in inventory order.

use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, CodePatterns, Facet, PatternInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

pub struct CodePatternsDetector;

const JS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "vue", "svelte"];
const GO: &[&str] = &["go"];
const RS: &[&str] = &["rs"];
const PY: &[&str] = &["py"];

struct PatternRule {
    group: &'static str,
    name: &'static str,
    description: &'static str,
    exts: &'static [&'static str],
    pattern: &'static str,
    usage: Option<&'static str>,
}

const fn rule(
    group: &'static str,
    name: &'static str,
    description: &'static str,
    exts: &'static [&'static str],
    pattern: &'static str,
) -> PatternRule {
    PatternRule {
        group,
        name,
        description,
        exts,
        pattern,
        usage: None,
    }
}

const fn rule_with_usage(
    group: &'static str,
    name: &'static str,
    description: &'static str,
    exts: &'static [&'static str],
    pattern: &'static str,
    usage: &'static str,
) -> PatternRule {
    PatternRule {
        group,
        name,
        description,
        exts,
        pattern,
        usage: Some(usage),
    }
}

static RULES: &[PatternRule] = &[
    // testing
    rule("testing", "Jest", "Jest test suites and mocks", JS, r#"from ['"]@jest/globals['"]|\bjest\.(fn|mock|spyOn)\("#),
    rule("testing", "Vitest", "Vitest test suites", JS, r#"from ['"]vitest['"]"#),
    rule_with_usage("testing", "Testing Library", "Component tests through Testing Library queries", JS, r#"from ['"]@testing-library/"#, "render(<Component />); screen.getByRole(...)"),
    rule("testing", "Playwright", "End-to-end browser tests", JS, r#"from ['"]@playwright/test['"]"#),
    rule("testing", "Go testing", "Table-driven tests with the standard testing package", GO, r"func Test\w+\(t \*testing\.T\)"),
    rule("testing", "Testify", "Assertions with testify", GO, r#""github\.com/stretchr/testify/"#),
    rule("testing", "pytest", "pytest tests and fixtures", PY, r"(?m)^import pytest|@pytest\.(fixture|mark)"),
    rule("testing", "Rust unit tests", "Unit tests in #[cfg(test)] modules", RS, r"#\[cfg\(test\)\]"),
    rule("testing", "Async Rust tests", "Async tests on the tokio runtime", RS, r"#\[tokio::test"),
    // dataFetching
    rule_with_usage("dataFetching", "React Query", "Server state cached with TanStack Query", JS, r#"from ['"](@tanstack/react-query|react-query)['"]"#, "const { data } = useQuery({ queryKey, queryFn })"),
    rule("dataFetching", "SWR", "Data fetching with SWR hooks", JS, r#"from ['"]swr['"]"#),
    rule("dataFetching", "Axios", "HTTP requests through axios", JS, r#"from ['"]axios['"]|require\(['"]axios['"]\)"#),
    rule("dataFetching", "Apollo Client", "GraphQL queries with Apollo Client", JS, r#"from ['"]@apollo/client['"]"#),
    rule("dataFetching", "Fetch API", "Native fetch calls", JS, r"\bawait fetch\("),
    // routing
    rule("routing", "React Router", "Client-side routing with React Router", JS, r#"from ['"]react-router(-dom)?['"]"#),
    rule("routing", "Next.js navigation", "Navigation through next/navigation or next/router", JS, r#"from ['"]next/(navigation|router|link)['"]"#),
    rule("routing", "Vue Router", "Routing with vue-router", JS, r#"from ['"]vue-router['"]"#),
    // forms
    rule("forms", "React Hook Form", "Forms managed by react-hook-form", JS, r#"from ['"]react-hook-form['"]"#),
    rule("forms", "Formik", "Forms managed by Formik", JS, r#"from ['"]formik['"]"#),
    rule("forms", "Zod", "Schema validation with zod", JS, r#"from ['"]zod['"]"#),
    rule("forms", "Yup", "Schema validation with yup", JS, r#"from ['"]yup['"]"#),
    // styling
    rule("styling", "Tailwind classes", "Utility classes in className attributes", JS, r#"className=["'][^"']*\b(flex|grid|p[xy]?-\d|m[xy]?-\d|text-(sm|lg|xl))\b"#),
    rule("styling", "CSS Modules", "Scoped styles imported from *.module.css", JS, r#"from ['"][^'"]+\.module\.(css|scss)['"]"#),
    rule("styling", "styled-components", "CSS-in-JS with styled-components", JS, r#"from ['"]styled-components['"]"#),
    rule("styling", "Emotion", "CSS-in-JS with Emotion", JS, r#"from ['"]@emotion/"#),
    // auth
    rule("auth", "NextAuth", "Authentication with NextAuth/Auth.js", JS, r#"from ['"](next-auth|@auth/)"#),
    rule("auth", "Passport", "Authentication strategies with Passport", JS, r#"from ['"]passport|require\(['"]passport"#),
    rule("auth", "JWT", "JSON Web Tokens", &["js", "ts", "go", "py", "rs"], r#"jsonwebtoken|golang-jwt|import jwt|\bjwt\.(sign|verify|decode)"#),
    rule("auth", "Clerk", "Authentication with Clerk", JS, r#"from ['"]@clerk/"#),
    // apiPatterns
    rule("apiPatterns", "Express routers", "Route modules built with express.Router()", JS, r"express\.Router\(\)"),
    rule("apiPatterns", "NestJS controllers", "Decorator-based controllers", &["ts"], r"@(Controller|Get|Post|Put|Delete)\("),
    rule("apiPatterns", "GraphQL", "GraphQL schemas and resolvers", &["js", "ts", "go", "py"], r"\bgql`|graphql\b"),
    rule("apiPatterns", "tRPC", "Typed procedures with tRPC", JS, r#"from ['"]@trpc/"#),
    rule("apiPatterns", "net/http handlers", "Handlers with the standard net/http package", GO, r"http\.(HandleFunc|Handle|ListenAndServe)\("),
    rule("apiPatterns", "FastAPI routers", "Endpoints grouped with APIRouter", PY, r"APIRouter\("),
    // dbOrm
    rule("dbOrm", "Prisma Client", "Database access through Prisma Client", JS, r#"from ['"]@prisma/client['"]"#),
    rule("dbOrm", "TypeORM", "Entities and repositories with TypeORM", JS, r#"from ['"]typeorm['"]"#),
    rule("dbOrm", "Mongoose", "MongoDB models with Mongoose", JS, r#"from ['"]mongoose['"]|require\(['"]mongoose['"]\)"#),
    rule("dbOrm", "Drizzle", "SQL with Drizzle ORM", JS, r#"from ['"]drizzle-orm"#),
    rule("dbOrm", "GORM", "Models and queries with GORM", GO, r#""gorm\.io/gorm""#),
    rule("dbOrm", "database/sql", "Raw SQL through database/sql", GO, r#""database/sql""#),
    rule("dbOrm", "SQLAlchemy", "ORM models with SQLAlchemy", PY, r"from sqlalchemy|import sqlalchemy"),
    rule("dbOrm", "Diesel", "Type-safe queries with Diesel", RS, r"\bdiesel::"),
    rule("dbOrm", "SQLx", "Compile-time checked SQL with sqlx", RS, r"\bsqlx::"),
    // utilities
    rule("utilities", "Lodash", "Utility helpers from lodash", JS, r#"from ['"]lodash(/[^'"]+|-es)?['"]"#),
    rule("utilities", "Date library", "Date handling with date-fns, dayjs or moment", JS, r#"from ['"](date-fns|dayjs|moment)['"]"#),
    rule("utilities", "clsx", "Conditional class names", JS, r#"from ['"](clsx|classnames)['"]"#),
    // stateMgmt
    rule("stateMgmt", "Redux Toolkit", "Global state in Redux slices", JS, r#"from ['"]@reduxjs/toolkit['"]|createSlice\("#),
    rule("stateMgmt", "Zustand", "Global state in Zustand stores", JS, r#"from ['"]zustand['"]"#),
    rule("stateMgmt", "Pinia", "Vue state in Pinia stores", JS, r"defineStore\("),
    rule("stateMgmt", "React Context", "Shared state through React context", JS, r"createContext\("),
    rule("stateMgmt", "MobX", "Observable state with MobX", JS, r#"from ['"]mobx['"]"#),
    // goPatterns
    rule("goPatterns", "Context propagation", "context.Context passed as the first parameter", GO, r"ctx context\.Context"),
    rule("goPatterns", "Goroutines", "Concurrent work in goroutines", GO, r"\bgo func\("),
    rule("goPatterns", "Channels", "Communication over channels", GO, r"\bchan\b|make\(chan "),
    rule_with_usage("goPatterns", "Error wrapping", "Errors wrapped with %w and inspected with errors.Is/As", GO, r#"fmt\.Errorf\("[^"]*%w|errors\.(Is|As)\("#, "return fmt.Errorf(\"load config: %w\", err)"),
    rule("goPatterns", "Sync primitives", "Mutexes and wait groups from sync", GO, r"sync\.(Mutex|RWMutex|WaitGroup|Once)"),
    rule("goPatterns", "Interfaces", "Behaviour abstracted behind small interfaces", GO, r"(?m)^type \w+ interface \{"),
    // rustPatterns
    rule("rustPatterns", "Async", "Async functions", RS, r"\basync fn\b"),
    rule("rustPatterns", "Serde", "Serialization with serde derives", RS, r"derive\([^)]*(Serialize|Deserialize)"),
    rule("rustPatterns", "thiserror", "Typed errors with thiserror", RS, r"#\[derive\([^)]*Error|thiserror::"),
    rule("rustPatterns", "anyhow", "Application errors with anyhow", RS, r"\banyhow::"),
    rule("rustPatterns", "Shared state", "Shared ownership with Arc and locks", RS, r"Arc<(Mutex|RwLock)"),
    rule("rustPatterns", "Traits", "Behaviour expressed as traits", RS, r"(?m)^\s*(pub )?trait \w+"),
    rule("rustPatterns", "Unsafe code", "Unsafe blocks", RS, r"\bunsafe \{"),
    // pythonPatterns
    rule("pythonPatterns", "Type hints", "Annotated function signatures", PY, r"def \w+\([^)]*\)\s*->"),
    rule("pythonPatterns", "Dataclasses", "Records defined with @dataclass", PY, r"@dataclass"),
    rule("pythonPatterns", "Pydantic", "Validation models with Pydantic", PY, r"from pydantic import|BaseModel\)"),
    rule("pythonPatterns", "Async", "Coroutines with async def", PY, r"\basync def\b"),
    rule("pythonPatterns", "Logging", "Module loggers from the logging package", PY, r"logging\.getLogger\("),
    // mlPatterns
    rule("mlPatterns", "PyTorch", "Models built with PyTorch", PY, r"(?m)^\s*(import torch|from torch)"),
    rule("mlPatterns", "TensorFlow", "Models built with TensorFlow/Keras", PY, r"(?m)^\s*(import tensorflow|from tensorflow|from keras|import keras)"),
    rule("mlPatterns", "scikit-learn", "Classical ML with scikit-learn", PY, r"(?m)^\s*from sklearn"),
    rule("mlPatterns", "Transformers", "Pretrained models from Hugging Face Transformers", PY, r"(?m)^\s*from transformers"),
    rule("mlPatterns", "NumPy", "Array computation with NumPy", PY, r"(?m)^\s*import numpy"),
    rule("mlPatterns", "pandas", "Tabular data with pandas", PY, r"(?m)^\s*import pandas"),
    rule("mlPatterns", "LangChain", "LLM pipelines with LangChain", PY, r"(?m)^\s*from langchain"),
];

static COMPILED: Lazy<Vec<Option<Regex>>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|r| match Regex::new(r.pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                debug!(pattern = r.name, error = %e, "Skipping invalid pattern rule");
                None
            }
        })
        .collect()
});

const SCANNED_EXTS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "mjs", "cjs", "vue", "svelte", "go", "rs", "py",
];

impl Detector for CodePatternsDetector {
    fn id(&self) -> DetectorId {
        DetectorId::CodePatterns
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let max = ctx.options.max_examples;
        let mut matches: Vec<(usize, Vec<String>)> = vec![(0, Vec::new()); RULES.len()];

        for entry in ctx.inventory.with_ext(SCANNED_EXTS) {
            let Some(content) = ctx.read_source(entry)? else {
                continue;
            };
            for (idx, rule) in RULES.iter().enumerate() {
                if !rule.exts.contains(&entry.ext.as_str()) {
                    continue;
                }
                let Some(re) = &COMPILED[idx] else {
                    continue;
                };
                if re.is_match(&content) {
                    let (count, examples) = &mut matches[idx];
                    *count += 1;
                    if examples.len() < max {
                        examples.push(entry.path.clone());
                    }
                }
            }
        }

        let mut patterns = CodePatterns::default();
        for (rule, (count, examples)) in RULES.iter().zip(matches) {
            if count == 0 {
                continue;
            }
            if let Some(group) = patterns.group_mut(rule.group) {
                group.push(PatternInfo {
                    name: rule.name.to_string(),
                    category: rule.group.to_string(),
                    description: rule.description.to_string(),
                    file_count: count,
                    examples,
                    usage: rule.usage.map(String::from),
                });
            }
        }

        Ok(Facet::CodePatterns(Arc::new(patterns)))
    }
}
