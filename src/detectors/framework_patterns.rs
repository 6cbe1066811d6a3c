use super::{collect_manifest_dependencies, DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Convention, ConventionCategory, ConventionSource, Facet};
use crate::fs::FileInventory;
use crate::stack::framework::FRAMEWORKS;

/// Conventions specific to the frameworks the manifests declare
///
/// Frameworks are re-derived from manifests rather than read from the tech
/// stack so that this detector depends on the inventory alone.
pub struct FrameworkPatternsDetector;

impl Detector for FrameworkPatternsDetector {
    fn id(&self) -> DetectorId {
        DetectorId::FrameworkPatterns
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let deps = collect_manifest_dependencies(ctx)?;
        let inv = &ctx.inventory;

        let mut items = Vec::new();
        for rule in FRAMEWORKS {
            if rule.match_dependency(&deps).is_none() && !rule.matches_fingerprint(inv) {
                continue;
            }
            items.extend(conventions_for(rule.name, inv));
        }

        Ok(Facet::Conventions {
            source: ConventionSource::Framework,
            items,
        })
    }
}

fn conventions_for(framework: &str, inv: &FileInventory) -> Vec<Convention> {
    use ConventionCategory::*;

    let mut out = Vec::new();
    match framework {
        "Next.js" => {
            let app_router = inv
                .files()
                .any(|f| (f.path.starts_with("app/") || f.path.starts_with("src/app/")) && f.name.starts_with("page."));
            if app_router {
                out.push(
                    Convention::new(
                        Structure,
                        "Next.js App Router: each route is a folder under app/ with page.tsx and optional layout.tsx",
                    )
                    .with_example("app/dashboard/page.tsx"),
                );
                out.push(Convention::new(
                    Components,
                    "Components are Server Components by default; add \"use client\" only when state or effects are needed",
                ));
            } else if inv.has_dir("pages") || inv.has_dir("src/pages") {
                out.push(Convention::new(
                    Structure,
                    "Next.js Pages Router: files under pages/ map to routes, API handlers live in pages/api/",
                ));
            }
        }
        "React" => {
            let hooks: Vec<_> = inv
                .files()
                .filter(|f| f.name.starts_with("use") && f.name.chars().nth(3).is_some_and(|c| c.is_ascii_uppercase()))
                .collect();
            if let Some(first) = hooks.first() {
                out.push(
                    Convention::new(Components, "Reusable logic is extracted into custom hooks named useXxx")
                        .with_example(first.path.clone()),
                );
            }
            out.push(Convention::new(
                Components,
                "Use function components with hooks; avoid class components",
            ));
        }
        "Vue" => {
            out.push(Convention::new(
                Components,
                "Vue components are single-file components (.vue) with <script setup>",
            ));
        }
        "Angular" => {
            out.push(Convention::new(
                Structure,
                "Angular features are split into *.component.ts, *.service.ts and *.module.ts files",
            ));
        }
        "Express" => {
            if inv.has_dir("routes") || inv.has_dir("src/routes") {
                out.push(Convention::new(
                    Api,
                    "Express routes are grouped per resource in routes/ using express.Router()",
                ));
            }
            out.push(Convention::new(
                ErrorHandling,
                "Errors are forwarded with next(err) to a central error-handling middleware",
            ));
        }
        "NestJS" => {
            out.push(Convention::new(
                Structure,
                "Each NestJS feature has a *.module.ts, *.controller.ts and *.service.ts; inject dependencies through constructors",
            ));
        }
        "Gin" | "Echo" | "Fiber" | "Chi" | "Gorilla Mux" => {
            out.push(Convention::new(
                Api,
                format!("HTTP routes are registered on the {} router; keep handlers thin and delegate to services", framework),
            ));
        }
        "Django" => {
            out.push(Convention::new(
                Structure,
                "Django apps group models.py, views.py, urls.py and migrations/; run makemigrations after model changes",
            ));
        }
        "FastAPI" => {
            out.push(Convention::new(
                Api,
                "FastAPI endpoints are organized in APIRouter modules with Pydantic request/response models",
            ));
        }
        "Flask" => {
            out.push(Convention::new(
                Api,
                "Flask routes are grouped into Blueprints registered on the app factory",
            ));
        }
        "Rails" => {
            out.push(Convention::new(
                Structure,
                "Follow Rails MVC conventions: models in app/models, controllers in app/controllers, RESTful routes in config/routes.rb",
            ));
        }
        "Spring Boot" => {
            out.push(Convention::new(
                Structure,
                "Spring components are layered as @RestController, @Service and @Repository classes",
            ));
        }
        "Axum" | "Actix Web" | "Rocket" => {
            out.push(Convention::new(
                Api,
                format!("{} handlers are async functions; shared state is passed through extractors", framework),
            ));
        }
        "Tailwind CSS" => {
            out.push(Convention::new(
                Style,
                "Style with Tailwind utility classes instead of custom CSS files",
            ));
        }
        "Prisma" => {
            out.push(
                Convention::new(
                    Structure,
                    "Database schema lives in prisma/schema.prisma; create a migration for every schema change",
                )
                .with_example("npx prisma migrate dev --name add_users"),
            );
        }
        "Redux" => {
            out.push(Convention::new(
                Structure,
                "Redux state is organized in slices created with createSlice",
            ));
        }
        "Zustand" | "Pinia" => {
            out.push(Convention::new(
                Structure,
                format!("Global state lives in {} stores, one store per domain", framework),
            ));
        }
        "Cobra" => {
            out.push(Convention::new(
                Structure,
                "CLI commands are cobra.Command values, one per file, registered in an init() on the root command",
            ));
        }
        "Jest" | "Vitest" => {
            out.push(Convention::new(
                Testing,
                format!("Unit tests run with {}; use describe/it blocks", framework),
            ));
        }
        "Pytest" => {
            out.push(Convention::new(
                Testing,
                "Use pytest fixtures (conftest.py) instead of setUp/tearDown",
            ));
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::{context_with, empty_analysis};

    fn conventions(files: &[(&str, &str)]) -> Vec<Convention> {
        let (_dir, ctx) = context_with(files);
        match FrameworkPatternsDetector
            .detect(&ctx, &empty_analysis(&ctx))
            .unwrap()
        {
            Facet::Conventions { source, items } => {
                assert_eq!(source, ConventionSource::Framework);
                items
            }
            other => panic!("unexpected facet {:?}", other),
        }
    }

    #[test]
    fn test_next_app_router() {
        let items = conventions(&[
            (
                "package.json",
                r#"{"dependencies": {"next": "14.1.0", "react": "18.2.0"}}"#,
            ),
            ("app/page.tsx", ""),
            ("app/layout.tsx", ""),
            ("hooks/useSession.ts", ""),
        ]);

        assert!(items[0].description.starts_with("Next.js App Router"));
        assert!(items.iter().any(|c| c.description.contains("custom hooks")));
    }

    #[test]
    fn test_gin_routes() {
        let items = conventions(&[(
            "go.mod",
            "module api\n\nrequire github.com/gin-gonic/gin v1.9.1\n",
        )]);
        assert_eq!(items.len(), 1);
        assert!(items[0].description.contains("Gin router"));
    }

    #[test]
    fn test_no_framework() {
        assert!(conventions(&[("main.go", "package main")]).is_empty());
    }
}
