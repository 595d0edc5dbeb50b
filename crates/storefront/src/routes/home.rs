//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::catalog;
use crate::filters;
use crate::routes::PageContext;
use crate::routes::products::ProductCard;
use crate::seo::{self, SITE_NAME};
use crate::state::AppState;

/// A selling point shown under the hero.
#[derive(Clone, Debug)]
pub struct Highlight {
    pub title: &'static str,
    pub body: &'static str,
}

const HIGHLIGHTS: &[Highlight] = &[
    Highlight {
        title: "Inspection ready",
        body: "Every kit includes a circuit directory that satisfies NEC 408.4(A).",
    },
    Highlight {
        title: "Built for the panel",
        body: "UV-resistant, heat-rated labels that stay legible for decades.",
    },
    Highlight {
        title: "Ships next business day",
        body: "Standard kits leave the shop within one business day.",
    },
];

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub featured: Vec<ProductCard>,
    pub highlights: &'static [Highlight],
}

/// Display the home page.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let base_url = &state.config().base_url;
    let page = PageContext::new(&state, "/", SITE_NAME)
        .json_ld(&[seo::organization(base_url), seo::website(base_url)]);

    HomeTemplate {
        page,
        featured: catalog::featured().into_iter().map(ProductCard::from).collect(),
        highlights: HIGHLIGHTS,
    }
}
