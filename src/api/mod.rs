use rocket::Route;

mod admin;
mod ballot;
mod status;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(ballot::routes());
    routes.extend(admin::routes());
    routes.extend(status::routes());
    routes
}
