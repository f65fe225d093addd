//! Cross-cutting properties: subtraction commutativity and the full
//! update-then-lookup data flow.

use shavar_core::{AddChunk, ChunkRanges, ListName, Prefix, PrefixData, SubChunk};
use shavar_proto::{encode_chunk_stream, ParsedChunk};
use shavar_store::{ChunkStore, MemoryStore};
use shavar_tests::harness::{list, TestHarness};
use shavar_url::digest;

fn prefix_data(bytes: [u8; 4]) -> PrefixData {
    PrefixData::from_bytes(&bytes).unwrap()
}

fn add(l: &ListName, n: u32, bytes: [u8; 4]) -> AddChunk {
    AddChunk {
        list: l.clone(),
        chunk_number: n,
        prefix: prefix_data(bytes),
    }
}

fn sub(l: &ListName, n: u32, add_n: u32, bytes: [u8; 4]) -> SubChunk {
    SubChunk {
        list: l.clone(),
        chunk_number: n,
        add_chunk_number: add_n,
        prefix: prefix_data(bytes),
    }
}

/// The set of add records a lookup would still consider, after pairwise
/// subtraction.
async fn surviving(store: &MemoryStore, l: &ListName, prefix: Prefix) -> Vec<(u32, PrefixData)> {
    let adds = store
        .add_chunks_by_prefix(prefix, std::slice::from_ref(l))
        .await
        .unwrap();
    let subs = store
        .sub_chunks_by_prefix(prefix, std::slice::from_ref(l))
        .await
        .unwrap();
    let mut out: Vec<(u32, PrefixData)> = adds
        .into_iter()
        .filter(|a| {
            !subs.iter().any(|s| {
                s.add_chunk_number == a.chunk_number && s.prefix == a.prefix
            })
        })
        .map(|a| (a.chunk_number, a.prefix))
        .collect();
    out.sort();
    out
}

#[tokio::test]
async fn subtraction_order_is_irrelevant() {
    let l = list("list-a");
    let p = Prefix::new([7, 7, 7, 7]);

    let adds = vec![
        add(&l, 1, [7, 7, 7, 7]),
        add(&l, 2, [7, 7, 7, 7]),
        add(&l, 3, [7, 7, 7, 7]),
    ];
    let subs = vec![sub(&l, 10, 2, [7, 7, 7, 7])];
    let deletes: Vec<u32> = ChunkRanges::parse("3").unwrap().iter().collect();

    // Order one: adds, subs, delete range.
    let first = MemoryStore::new();
    first.put_add_chunks(adds.clone()).await.unwrap();
    first.put_sub_chunks(subs.clone()).await.unwrap();
    first.delete_add_chunks(&l, &deletes).await.unwrap();

    // Order two: adds, delete range, subs.
    let second = MemoryStore::new();
    second.put_add_chunks(adds).await.unwrap();
    second.delete_add_chunks(&l, &deletes).await.unwrap();
    second.put_sub_chunks(subs).await.unwrap();

    let a = surviving(&first, &l, p).await;
    let b = surviving(&second, &l, p).await;
    assert_eq!(a, b);
    assert_eq!(a, vec![(1, prefix_data([7, 7, 7, 7]))]);
}

#[tokio::test]
async fn duplicate_application_is_idempotent() {
    let l = list("list-a");
    let p = Prefix::new([7, 7, 7, 7]);

    let store = MemoryStore::new();
    let adds = vec![add(&l, 1, [7, 7, 7, 7])];
    let subs = vec![sub(&l, 2, 1, [7, 7, 7, 7])];

    // The same chunks re-applied (a re-sent redirect) change nothing.
    for _ in 0..3 {
        store.put_add_chunks(adds.clone()).await.unwrap();
        store.put_sub_chunks(subs.clone()).await.unwrap();
    }

    assert!(surviving(&store, &l, p).await.is_empty());
    let (add_ranges, sub_ranges) = store.ranges(&l).await.unwrap();
    assert_eq!(add_ranges.to_string(), "1");
    assert_eq!(sub_ranges.to_string(), "2");
}

#[tokio::test]
async fn update_feeds_lookup_end_to_end() {
    let h = TestHarness::new();
    let l = list("goog-malware-shavar");
    let url = "http://malware.example/";
    let hash = digest("malware.example/");
    let entry = PrefixData::prefix(hash.prefix());

    // First poll delivers the add chunk.
    h.transport.push_update_response(Ok(
        "n:1200\ni:goog-malware-shavar\nu:cache.example/chunk-17\n",
    ));
    h.transport
        .push_redirect_response(Ok(encode_chunk_stream(&[ParsedChunk::Add {
            chunk_number: 17,
            prefixes: vec![entry.clone()],
        }])));
    h.client.force_update(std::slice::from_ref(&l)).await;

    let mut gethash = format!("900\n{l}:32:1\n").into_bytes();
    gethash.extend_from_slice(hash.as_bytes());
    h.transport.push_gethash_response(Ok(gethash));

    let matches = h.client.lookup(std::slice::from_ref(&l), url).await.unwrap();
    assert_eq!(matches, vec![l.clone()]);

    // Second poll retracts it.
    h.transport.push_update_response(Ok(
        "n:1200\ni:goog-malware-shavar\nu:cache.example/chunk-sub\n",
    ));
    h.transport
        .push_redirect_response(Ok(encode_chunk_stream(&[ParsedChunk::Sub {
            chunk_number: 9,
            entries: vec![(17, entry)],
        }])));
    h.client.force_update(std::slice::from_ref(&l)).await;

    let matches = h.client.lookup(std::slice::from_ref(&l), url).await.unwrap();
    assert!(matches.is_empty());

    // The second request declared both sequences.
    let body = &h.transport.update_requests()[1].1;
    assert_eq!(body, "goog-malware-shavar;a:17\n");
    let (_, sub_ranges) = h.store.ranges(&l).await.unwrap();
    assert_eq!(sub_ranges.to_string(), "9");
}
