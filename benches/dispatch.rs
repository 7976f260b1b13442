use apigate::context::ServiceIdentity;
use apigate::gateway::Gateway;
use apigate::registry::{HandlerRegistry, RouteTable};
use apigate::server::{BufferedResponse, RawRequest};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn zoo_table() -> RouteTable {
    let mut table = RouteTable::new();
    let routes = [
        (Method::GET, "/", "root_handler"),
        (Method::GET, "/zoo/animals", "get_animals"),
        (Method::POST, "/zoo/animals", "create_animal"),
        (Method::GET, "/zoo/animals/{id}", "get_animal"),
        (Method::PUT, "/zoo/animals/{id}", "update_animal"),
        (Method::DELETE, "/zoo/animals/{id}", "delete_animal"),
        (Method::GET, "/zoo/animals/{id}/toys/{toy_id}", "animal_toy"),
        (
            Method::GET,
            "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
            "deep_section",
        ),
    ];
    for (method, pattern, name) in routes {
        table
            .register(method, pattern, name, |req| {
                Ok(json!({ "handler": req.handler_name }))
            })
            .unwrap();
    }
    table
}

fn bench_resolve(c: &mut Criterion) {
    let table = zoo_table();
    c.bench_function("resolve_static", |b| {
        b.iter(|| table.resolve(black_box(&Method::GET), black_box("/zoo/animals")))
    });
    c.bench_function("resolve_deep_params", |b| {
        b.iter(|| {
            table.resolve(
                black_box(&Method::GET),
                black_box("/zoo/mammals/animals/7/habitats/3/sections/12"),
            )
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let gateway = Gateway::with_registry(
        Arc::new(zoo_table()),
        ServiceIdentity::new("bench-1", "bench").unwrap(),
    );
    c.bench_function("dispatch_success", |b| {
        b.iter(|| {
            let mut res = BufferedResponse::new();
            gateway.dispatch(black_box(RawRequest::new("GET", "/zoo/animals/42")), &mut res)
        })
    });
    c.bench_function("dispatch_not_found", |b| {
        b.iter(|| {
            let mut res = BufferedResponse::new();
            gateway.dispatch(black_box(RawRequest::new("GET", "/aquarium")), &mut res)
        })
    });
}

criterion_group!(benches, bench_resolve, bench_dispatch);
criterion_main!(benches);
