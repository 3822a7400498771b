pub mod engine;
pub mod games;

#[cfg(test)]
fn approx_eq(a: f32, b: f32) -> bool {
    use float_cmp::{ApproxEq, F32Margin};

    a.approx_eq(
        b,
        F32Margin {
            epsilon: 1e-4,
            ulps: 8,
        },
    )
}
