#[cfg(test)]
mod support;

#[cfg(test)]
mod actions_test;
#[cfg(test)]
mod schema_test;
#[cfg(test)]
mod transaction_test;
#[cfg(test)]
mod storage_test;
