//! Framework, database and tool fingerprints
//!
//! Framework detection is deterministic: a framework is present when one of
//! its dependency patterns matches a declared dependency, or when one of its
//! fingerprint files exists in the inventory.

use super::manifest::DeclaredDependency;
use crate::analysis::FrameworkCategory;
use crate::fs::FileInventory;

/// Ecosystem a dependency pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyPatternType {
    /// npm package name (e.g., "express")
    NpmPackage,
    /// Go module path prefix (e.g., "github.com/gin-gonic/gin")
    GoModule,
    /// PyPI package name, case-insensitive (e.g., "django")
    PypiPackage,
    /// crates.io crate name
    Crate,
    /// RubyGems gem name
    Gem,
    /// Maven group:artifact substring (e.g., "org.springframework.boot")
    MavenGroupArtifact,
    /// Packagist package name (e.g., "laravel/framework")
    ComposerPackage,
}

/// A dependency declared by one of the repository's manifests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDependency {
    pub kind: DependencyPatternType,
    pub dependency: DeclaredDependency,
    /// Root-relative manifest path
    pub manifest: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DependencyPattern {
    pub pattern_type: DependencyPatternType,
    pub pattern: &'static str,
}

impl DependencyPattern {
    pub const fn new(pattern_type: DependencyPatternType, pattern: &'static str) -> Self {
        Self {
            pattern_type,
            pattern,
        }
    }

    pub fn matches(&self, dep: &ManifestDependency) -> bool {
        if dep.kind != self.pattern_type {
            return false;
        }
        let name = dep.dependency.name.as_str();
        match self.pattern_type {
            DependencyPatternType::GoModule => {
                name == self.pattern || name.starts_with(&format!("{}/", self.pattern))
            }
            DependencyPatternType::MavenGroupArtifact => name.contains(self.pattern),
            DependencyPatternType::PypiPackage => name.eq_ignore_ascii_case(self.pattern),
            _ => name == self.pattern,
        }
    }
}

pub struct FrameworkRule {
    pub name: &'static str,
    pub category: FrameworkCategory,
    pub patterns: &'static [DependencyPattern],
    /// Root-relative paths whose presence implies the framework
    pub fingerprints: &'static [&'static str],
}

impl FrameworkRule {
    /// First matching dependency, if any
    pub fn match_dependency<'a>(
        &self,
        deps: &'a [ManifestDependency],
    ) -> Option<&'a ManifestDependency> {
        deps.iter()
            .find(|dep| self.patterns.iter().any(|p| p.matches(dep)))
    }

    pub fn matches_fingerprint(&self, inventory: &FileInventory) -> bool {
        self.fingerprints.iter().any(|fp| inventory.contains(fp))
    }
}

use DependencyPatternType::{
    ComposerPackage as Composer, Crate, Gem, GoModule as Go, MavenGroupArtifact as Maven,
    NpmPackage as Npm, PypiPackage as Pypi,
};
use FrameworkCategory as Cat;

const fn dep(pattern_type: DependencyPatternType, pattern: &'static str) -> DependencyPattern {
    DependencyPattern::new(pattern_type, pattern)
}

pub static FRAMEWORKS: &[FrameworkRule] = &[
    // Fullstack meta-frameworks first so their names precede the UI library
    FrameworkRule {
        name: "Next.js",
        category: Cat::Fullstack,
        patterns: &[dep(Npm, "next")],
        fingerprints: &["next.config.js", "next.config.mjs", "next.config.ts"],
    },
    FrameworkRule {
        name: "Nuxt",
        category: Cat::Fullstack,
        patterns: &[dep(Npm, "nuxt")],
        fingerprints: &["nuxt.config.ts", "nuxt.config.js"],
    },
    FrameworkRule {
        name: "SvelteKit",
        category: Cat::Fullstack,
        patterns: &[dep(Npm, "@sveltejs/kit")],
        fingerprints: &["svelte.config.js"],
    },
    FrameworkRule {
        name: "Remix",
        category: Cat::Fullstack,
        patterns: &[dep(Npm, "@remix-run/react")],
        fingerprints: &["remix.config.js"],
    },
    FrameworkRule {
        name: "Astro",
        category: Cat::Fullstack,
        patterns: &[dep(Npm, "astro")],
        fingerprints: &["astro.config.mjs", "astro.config.ts"],
    },
    FrameworkRule {
        name: "Rails",
        category: Cat::Fullstack,
        patterns: &[dep(Gem, "rails")],
        fingerprints: &["config/routes.rb"],
    },
    FrameworkRule {
        name: "Django",
        category: Cat::Fullstack,
        patterns: &[dep(Pypi, "django")],
        fingerprints: &["manage.py"],
    },
    FrameworkRule {
        name: "Laravel",
        category: Cat::Fullstack,
        patterns: &[dep(Composer, "laravel/framework")],
        fingerprints: &["artisan"],
    },
    // Frontend
    FrameworkRule {
        name: "React",
        category: Cat::Frontend,
        patterns: &[dep(Npm, "react")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Vue",
        category: Cat::Frontend,
        patterns: &[dep(Npm, "vue")],
        fingerprints: &["vue.config.js"],
    },
    FrameworkRule {
        name: "Angular",
        category: Cat::Frontend,
        patterns: &[dep(Npm, "@angular/core")],
        fingerprints: &["angular.json"],
    },
    FrameworkRule {
        name: "Svelte",
        category: Cat::Frontend,
        patterns: &[dep(Npm, "svelte")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "SolidJS",
        category: Cat::Frontend,
        patterns: &[dep(Npm, "solid-js")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Preact",
        category: Cat::Frontend,
        patterns: &[dep(Npm, "preact")],
        fingerprints: &[],
    },
    // Backend
    FrameworkRule {
        name: "Express",
        category: Cat::Backend,
        patterns: &[dep(Npm, "express")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Fastify",
        category: Cat::Backend,
        patterns: &[dep(Npm, "fastify")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "NestJS",
        category: Cat::Backend,
        patterns: &[dep(Npm, "@nestjs/core")],
        fingerprints: &["nest-cli.json"],
    },
    FrameworkRule {
        name: "Koa",
        category: Cat::Backend,
        patterns: &[dep(Npm, "koa")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Hono",
        category: Cat::Backend,
        patterns: &[dep(Npm, "hono")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Gin",
        category: Cat::Backend,
        patterns: &[dep(Go, "github.com/gin-gonic/gin")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Echo",
        category: Cat::Backend,
        patterns: &[dep(Go, "github.com/labstack/echo")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Fiber",
        category: Cat::Backend,
        patterns: &[dep(Go, "github.com/gofiber/fiber")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Chi",
        category: Cat::Backend,
        patterns: &[dep(Go, "github.com/go-chi/chi")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Gorilla Mux",
        category: Cat::Backend,
        patterns: &[dep(Go, "github.com/gorilla/mux")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Flask",
        category: Cat::Backend,
        patterns: &[dep(Pypi, "flask")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "FastAPI",
        category: Cat::Backend,
        patterns: &[dep(Pypi, "fastapi")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Spring Boot",
        category: Cat::Backend,
        patterns: &[dep(Maven, "org.springframework.boot")],
        fingerprints: &["src/main/resources/application.properties", "src/main/resources/application.yml"],
    },
    FrameworkRule {
        name: "Axum",
        category: Cat::Backend,
        patterns: &[dep(Crate, "axum")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Actix Web",
        category: Cat::Backend,
        patterns: &[dep(Crate, "actix-web")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Rocket",
        category: Cat::Backend,
        patterns: &[dep(Crate, "rocket")],
        fingerprints: &["Rocket.toml"],
    },
    FrameworkRule {
        name: "Sinatra",
        category: Cat::Backend,
        patterns: &[dep(Gem, "sinatra")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Symfony",
        category: Cat::Backend,
        patterns: &[dep(Composer, "symfony/framework-bundle")],
        fingerprints: &["symfony.lock"],
    },
    // Database access
    FrameworkRule {
        name: "Prisma",
        category: Cat::Database,
        patterns: &[dep(Npm, "prisma"), dep(Npm, "@prisma/client")],
        fingerprints: &["prisma/schema.prisma"],
    },
    FrameworkRule {
        name: "Drizzle",
        category: Cat::Database,
        patterns: &[dep(Npm, "drizzle-orm")],
        fingerprints: &["drizzle.config.ts"],
    },
    FrameworkRule {
        name: "TypeORM",
        category: Cat::Database,
        patterns: &[dep(Npm, "typeorm")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Sequelize",
        category: Cat::Database,
        patterns: &[dep(Npm, "sequelize")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Mongoose",
        category: Cat::Database,
        patterns: &[dep(Npm, "mongoose")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "GORM",
        category: Cat::Database,
        patterns: &[dep(Go, "gorm.io/gorm")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "SQLAlchemy",
        category: Cat::Database,
        patterns: &[dep(Pypi, "sqlalchemy")],
        fingerprints: &["alembic.ini"],
    },
    FrameworkRule {
        name: "Diesel",
        category: Cat::Database,
        patterns: &[dep(Crate, "diesel")],
        fingerprints: &["diesel.toml"],
    },
    FrameworkRule {
        name: "SQLx",
        category: Cat::Database,
        patterns: &[dep(Crate, "sqlx")],
        fingerprints: &[],
    },
    // Testing
    FrameworkRule {
        name: "Jest",
        category: Cat::Testing,
        patterns: &[dep(Npm, "jest")],
        fingerprints: &["jest.config.js", "jest.config.ts"],
    },
    FrameworkRule {
        name: "Vitest",
        category: Cat::Testing,
        patterns: &[dep(Npm, "vitest")],
        fingerprints: &["vitest.config.ts"],
    },
    FrameworkRule {
        name: "Mocha",
        category: Cat::Testing,
        patterns: &[dep(Npm, "mocha")],
        fingerprints: &[".mocharc.json", ".mocharc.yml"],
    },
    FrameworkRule {
        name: "Cypress",
        category: Cat::Testing,
        patterns: &[dep(Npm, "cypress")],
        fingerprints: &["cypress.config.ts", "cypress.config.js"],
    },
    FrameworkRule {
        name: "Playwright",
        category: Cat::Testing,
        patterns: &[dep(Npm, "@playwright/test")],
        fingerprints: &["playwright.config.ts"],
    },
    FrameworkRule {
        name: "Pytest",
        category: Cat::Testing,
        patterns: &[dep(Pypi, "pytest")],
        fingerprints: &["pytest.ini", "conftest.py"],
    },
    FrameworkRule {
        name: "Testify",
        category: Cat::Testing,
        patterns: &[dep(Go, "github.com/stretchr/testify")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "RSpec",
        category: Cat::Testing,
        patterns: &[dep(Gem, "rspec"), dep(Gem, "rspec-rails")],
        fingerprints: &[".rspec"],
    },
    FrameworkRule {
        name: "JUnit",
        category: Cat::Testing,
        patterns: &[dep(Maven, "org.junit")],
        fingerprints: &[],
    },
    // Styling
    FrameworkRule {
        name: "Tailwind CSS",
        category: Cat::Styling,
        patterns: &[dep(Npm, "tailwindcss")],
        fingerprints: &["tailwind.config.js", "tailwind.config.ts"],
    },
    FrameworkRule {
        name: "styled-components",
        category: Cat::Styling,
        patterns: &[dep(Npm, "styled-components")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Emotion",
        category: Cat::Styling,
        patterns: &[dep(Npm, "@emotion/react")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Sass",
        category: Cat::Styling,
        patterns: &[dep(Npm, "sass")],
        fingerprints: &[],
    },
    // State management
    FrameworkRule {
        name: "Redux",
        category: Cat::State,
        patterns: &[dep(Npm, "@reduxjs/toolkit"), dep(Npm, "redux")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Zustand",
        category: Cat::State,
        patterns: &[dep(Npm, "zustand")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "MobX",
        category: Cat::State,
        patterns: &[dep(Npm, "mobx")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Pinia",
        category: Cat::State,
        patterns: &[dep(Npm, "pinia")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Jotai",
        category: Cat::State,
        patterns: &[dep(Npm, "jotai")],
        fingerprints: &[],
    },
    // CLI
    FrameworkRule {
        name: "Cobra",
        category: Cat::Cli,
        patterns: &[dep(Go, "github.com/spf13/cobra")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "urfave/cli",
        category: Cat::Cli,
        patterns: &[dep(Go, "github.com/urfave/cli")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Clap",
        category: Cat::Cli,
        patterns: &[dep(Crate, "clap")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Click",
        category: Cat::Cli,
        patterns: &[dep(Pypi, "click")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Typer",
        category: Cat::Cli,
        patterns: &[dep(Pypi, "typer")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Commander",
        category: Cat::Cli,
        patterns: &[dep(Npm, "commander")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "Yargs",
        category: Cat::Cli,
        patterns: &[dep(Npm, "yargs")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "oclif",
        category: Cat::Cli,
        patterns: &[dep(Npm, "@oclif/core")],
        fingerprints: &[],
    },
    // Tooling
    FrameworkRule {
        name: "Vite",
        category: Cat::Tooling,
        patterns: &[dep(Npm, "vite")],
        fingerprints: &["vite.config.ts", "vite.config.js"],
    },
    FrameworkRule {
        name: "Webpack",
        category: Cat::Tooling,
        patterns: &[dep(Npm, "webpack")],
        fingerprints: &["webpack.config.js"],
    },
    FrameworkRule {
        name: "Storybook",
        category: Cat::Tooling,
        patterns: &[dep(Npm, "storybook"), dep(Npm, "@storybook/react")],
        fingerprints: &[".storybook/main.ts", ".storybook/main.js"],
    },
    FrameworkRule {
        name: "Tokio",
        category: Cat::Other,
        patterns: &[dep(Crate, "tokio")],
        fingerprints: &[],
    },
    FrameworkRule {
        name: "PyTorch",
        category: Cat::Other,
        patterns: &[dep(Pypi, "torch")],
        fingerprints: &[],
    },
];

/// Databases implied by client libraries
pub static DATABASES: &[(&str, &[DependencyPattern])] = &[
    (
        "PostgreSQL",
        &[
            dep(Npm, "pg"),
            dep(Npm, "postgres"),
            dep(Go, "github.com/lib/pq"),
            dep(Go, "github.com/jackc/pgx"),
            dep(Pypi, "psycopg2"),
            dep(Pypi, "psycopg2-binary"),
            dep(Pypi, "asyncpg"),
            dep(Crate, "tokio-postgres"),
            dep(Gem, "pg"),
            dep(Maven, "org.postgresql"),
        ],
    ),
    (
        "MySQL",
        &[
            dep(Npm, "mysql"),
            dep(Npm, "mysql2"),
            dep(Go, "github.com/go-sql-driver/mysql"),
            dep(Pypi, "pymysql"),
            dep(Gem, "mysql2"),
            dep(Maven, "mysql:mysql-connector"),
        ],
    ),
    (
        "MongoDB",
        &[
            dep(Npm, "mongodb"),
            dep(Npm, "mongoose"),
            dep(Go, "go.mongodb.org/mongo-driver"),
            dep(Pypi, "pymongo"),
            dep(Pypi, "motor"),
            dep(Crate, "mongodb"),
        ],
    ),
    (
        "Redis",
        &[
            dep(Npm, "redis"),
            dep(Npm, "ioredis"),
            dep(Go, "github.com/redis/go-redis"),
            dep(Go, "github.com/go-redis/redis"),
            dep(Pypi, "redis"),
            dep(Crate, "redis"),
            dep(Gem, "redis"),
        ],
    ),
    (
        "SQLite",
        &[
            dep(Npm, "sqlite3"),
            dep(Npm, "better-sqlite3"),
            dep(Go, "github.com/mattn/go-sqlite3"),
            dep(Crate, "rusqlite"),
            dep(Gem, "sqlite3"),
        ],
    ),
    (
        "Elasticsearch",
        &[
            dep(Npm, "@elastic/elasticsearch"),
            dep(Go, "github.com/elastic/go-elasticsearch"),
            dep(Pypi, "elasticsearch"),
        ],
    ),
];

/// Tools implied by root-relative paths
pub static TOOL_FINGERPRINTS: &[(&str, &str)] = &[
    ("Dockerfile", "Docker"),
    ("docker-compose.yml", "Docker Compose"),
    ("docker-compose.yaml", "Docker Compose"),
    ("compose.yaml", "Docker Compose"),
    ("Makefile", "Make"),
    ("justfile", "just"),
    ("Taskfile.yml", "Task"),
    (".github/workflows", "GitHub Actions"),
    (".gitlab-ci.yml", "GitLab CI"),
    (".circleci/config.yml", "CircleCI"),
    ("Jenkinsfile", "Jenkins"),
    ("turbo.json", "Turborepo"),
    ("nx.json", "Nx"),
    ("pnpm-workspace.yaml", "pnpm"),
    ("bunfig.toml", "Bun"),
    ("tsconfig.json", "TypeScript compiler"),
    (".eslintrc.json", "ESLint"),
    (".eslintrc.js", "ESLint"),
    ("eslint.config.js", "ESLint"),
    (".prettierrc", "Prettier"),
    ("biome.json", "Biome"),
    (".golangci.yml", "golangci-lint"),
    ("ruff.toml", "Ruff"),
    ("helm", "Helm"),
    ("k8s", "Kubernetes"),
];

pub fn database_matches(patterns: &[DependencyPattern], deps: &[ManifestDependency]) -> bool {
    deps.iter().any(|d| patterns.iter().any(|p| p.matches(d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FileEntry;

    fn manifest_dep(kind: DependencyPatternType, name: &str) -> ManifestDependency {
        ManifestDependency {
            kind,
            dependency: DeclaredDependency {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                dev: false,
            },
            manifest: "manifest".to_string(),
        }
    }

    #[test]
    fn test_go_module_prefix_match() {
        let pattern = DependencyPattern::new(Go, "github.com/labstack/echo");
        assert!(pattern.matches(&manifest_dep(Go, "github.com/labstack/echo/v4")));
        assert!(!pattern.matches(&manifest_dep(Go, "github.com/labstack/echoes")));
        assert!(!pattern.matches(&manifest_dep(Npm, "github.com/labstack/echo")));
    }

    #[test]
    fn test_pypi_case_insensitive() {
        let pattern = DependencyPattern::new(Pypi, "django");
        assert!(pattern.matches(&manifest_dep(Pypi, "Django")));
    }

    #[test]
    fn test_maven_substring() {
        let pattern = DependencyPattern::new(Maven, "org.springframework.boot");
        assert!(pattern.matches(&manifest_dep(
            Maven,
            "org.springframework.boot:spring-boot-starter-web"
        )));
    }

    #[test]
    fn test_fingerprint_match() {
        let rule = FRAMEWORKS
            .iter()
            .find(|f| f.name == "Next.js")
            .unwrap();
        let inventory = FileInventory::new(vec![FileEntry::file("next.config.mjs", 10)]);
        assert!(rule.matches_fingerprint(&inventory));
    }

    #[test]
    fn test_framework_names_unique() {
        let mut names: Vec<_> = FRAMEWORKS.iter().map(|f| f.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_database_detection() {
        let deps = vec![manifest_dep(Npm, "pg")];
        let postgres = DATABASES.iter().find(|(n, _)| *n == "PostgreSQL").unwrap();
        assert!(database_matches(postgres.1, &deps));
    }
}
