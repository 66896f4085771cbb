use actix_web::{Scope, web};

use crate::handlers::health_handlers::{health_check, index};
use crate::handlers::news_handlers::{
    create_news, delete_news, get_all_news, get_news_by_id, get_news_by_slug, update_news,
};
use crate::handlers::newsletter_handlers::{get_newsletter_subscribers, newsletter_signup};
use crate::handlers::post_handlers::{
    create_post, delete_post, get_all_posts, get_post_by_id, get_post_by_slug, update_post,
};
use crate::handlers::user_handlers::{
    delete_user, get_all_profiles, get_profile_by_id, get_user_by_id, get_users, update_profile,
};
use crate::handlers::visit_handlers::{get_visit_statistics, get_visitor_details, record_visit};
use crate::middlewares::rate_limit::VisitRateLimit;
use crate::models::post::{DigitalEdition, Family, Fashion, Latest, PostSection, Video};

/// Create, list, by-slug, by-id, update and delete paths of one post section.
struct SectionPaths {
    create: &'static str,
    list: &'static str,
    by_slug: &'static str,
    by_id: &'static str,
    update: &'static str,
    delete: &'static str,
}

fn section_routes<S: PostSection>(scope: Scope, paths: SectionPaths) -> Scope {
    scope
        .route(paths.create, web::post().to(create_post::<S>))
        .route(paths.list, web::get().to(get_all_posts::<S>))
        .route(paths.by_slug, web::get().to(get_post_by_slug::<S>))
        .route(paths.by_id, web::get().to(get_post_by_id::<S>))
        .route(paths.update, web::put().to(update_post::<S>))
        .route(paths.delete, web::delete().to(delete_post::<S>))
}

/// Configure the routes
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
    // Visit tracking. Only recording is throttled per IP
    cfg.service(
        web::scope("/api/visits")
            .service(
                web::resource("/record")
                    .wrap(VisitRateLimit)
                    .route(web::post().to(record_visit)),
            )
            .route("/statistics", web::get().to(get_visit_statistics))
            .route("/{ip_address}", web::get().to(get_visitor_details)),
    );

    let api = web::scope("/api")
        .route("/health/check", web::get().to(health_check))
        .route("/createNews", web::post().to(create_news))
        .route("/getAllNews", web::get().to(get_all_news))
        .route("/getNewsBySlug/{slug}", web::get().to(get_news_by_slug))
        .route("/getNewsById/{id}", web::get().to(get_news_by_id))
        .route("/updateNews/{id}", web::put().to(update_news))
        .route("/deleteNews/{id}", web::delete().to(delete_news))
        .route("/newsletter-signup", web::post().to(newsletter_signup))
        .route(
            "/getNewsletterSubscribers",
            web::get().to(get_newsletter_subscribers),
        )
        // Profiles
        .route("/getAllProfiles", web::get().to(get_all_profiles))
        .route("/getProfileById/{id}", web::get().to(get_profile_by_id))
        .route("/updateProfile/{id}", web::put().to(update_profile))
        .route("/deleteUser/{id}", web::delete().to(delete_user))
        .route("/getUsers", web::get().to(get_users))
        .route("/getUserById/{id}", web::get().to(get_user_by_id));

    let api = section_routes::<Fashion>(
        api,
        SectionPaths {
            create: "/createFashion",
            list: "/getAllFashion",
            by_slug: "/getFashionBySlug/{slug}",
            by_id: "/getFashionById/{id}",
            update: "/updateFashion/{id}",
            delete: "/deleteFashion/{id}",
        },
    );
    let api = section_routes::<Family>(
        api,
        SectionPaths {
            create: "/createFamily",
            list: "/getAllFamily",
            by_slug: "/getFamilyBySlug/{slug}",
            by_id: "/getFamilyById/{id}",
            update: "/updateFamily/{id}",
            delete: "/deleteFamily/{id}",
        },
    );
    let api = section_routes::<Latest>(
        api,
        SectionPaths {
            create: "/createLatest",
            list: "/getAllLatest",
            by_slug: "/getLatestBySlug/{slug}",
            by_id: "/getLatestById/{id}",
            update: "/updateLatest/{id}",
            delete: "/deleteLatest/{id}",
        },
    );
    let api = section_routes::<DigitalEdition>(
        api,
        SectionPaths {
            create: "/createDigitalEdition",
            list: "/getAllDigitalEditions",
            by_slug: "/getDigitalEditionBySlug/{slug}",
            by_id: "/getDigitalEditionById/{id}",
            update: "/updateDigitalEdition/{id}",
            delete: "/deleteDigitalEdition/{id}",
        },
    );
    let api = section_routes::<Video>(
        api,
        SectionPaths {
            create: "/UploadVideo",
            list: "/getAllVideos",
            by_slug: "/getVideosBySlug/{slug}",
            by_id: "/getVideosById/{id}",
            update: "/updateVideo/{id}",
            delete: "/deleteVideo/{id}",
        },
    );

    cfg.service(api);
}
