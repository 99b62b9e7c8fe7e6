pub mod fixture;
pub mod reply;

#[must_use]
pub fn adapter_name() -> &'static str {
    "veranda-adapters"
}

#[cfg(test)]
mod tests {
    use super::adapter_name;

    #[test]
    fn adapter_name_is_stable() {
        assert_eq!(adapter_name(), "veranda-adapters");
    }
}
